//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust, implementing the
//! Terraform Plugin Protocol v6.9.

// Core modules
pub mod attribute_type;
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod provider;
pub mod request;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod validator;

// Protocol and server
pub mod grpc;
pub mod proto;
pub mod server;

// Re-exports for convenience
pub use context::Context;
pub use error::{Result, TfplugError};
pub use import::{import_state_composite_id, import_state_passthrough_id};
pub use provider::{DataSourceV2, ProviderV2, ResourceV2};
pub use schema::{AttributeBuilder, AttributeType, BlockBuilder, Schema, SchemaBuilder};
pub use server::{serve, serve_default, ServerConfig};
pub use types::{AttributePath, Config, Diagnostics, Dynamic, State};

// Convenience macro for main function
#[macro_export]
macro_rules! serve_provider {
    ($provider:expr) => {
        #[tokio::main]
        async fn main() -> $crate::Result<()> {
            $crate::serve_default($provider).await
        }
    };
    ($provider:expr, $config:expr) => {
        #[tokio::main]
        async fn main() -> $crate::Result<()> {
            $crate::serve($provider, $config).await
        }
    };
}
