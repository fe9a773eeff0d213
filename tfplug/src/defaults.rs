//! Default value providers for attributes
//!
//! Defaults are applied during planning when an optional+computed attribute
//! is null in configuration. They never override an explicit value.
//!
//! ```no_run
//! use tfplug::defaults::StaticDefault;
//! use tfplug::schema::AttributeBuilder;
//!
//! let state = AttributeBuilder::string("state")
//!     .optional()
//!     .computed()
//!     .default(StaticDefault::string("ENABLED"));
//! ```

use crate::types::Dynamic;
use std::sync::Arc;

pub trait Default: Send + Sync {
    fn description(&self) -> String;
    fn default_value(&self) -> Dynamic;
}

/// StaticDefault provides a fixed default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Arc<dyn Default> {
        Arc::new(Self { value })
    }

    pub fn string(value: &str) -> Arc<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Arc<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Arc<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self) -> Dynamic {
        self.value.clone()
    }
}
