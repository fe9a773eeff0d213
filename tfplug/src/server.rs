//! Server module for running Terraform providers
//!
//! This module provides functionality to start a Terraform provider server
//! with TLS support and the go-plugin handshake.

use crate::error::{Result, TfplugError};
use crate::grpc::ProviderServer;
use crate::provider::ProviderV2;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinError;

/// Cookie Terraform sets in the plugin's environment. Launching the binary
/// by hand leaves it unset.
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

const CERT_PATH_ENV: &str = "TF_PLUGIN_CERT_PATH";
const KEY_PATH_ENV: &str = "TF_PLUGIN_KEY_PATH";

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to TLS certificate file
    pub cert_path: PathBuf,
    /// Path to TLS key file
    pub key_path: PathBuf,
    /// Maximum message size in bytes
    pub max_message_size: usize,
    /// Timeout for graceful shutdown
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("./certs/localhost.pem"),
            key_path: PathBuf::from("./certs/localhost-key.pem"),
            max_message_size: 256 << 20, // 256MB
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Certificate paths from `TF_PLUGIN_CERT_PATH`/`TF_PLUGIN_KEY_PATH`,
    /// falling back to `certs/` next to the executable.
    pub fn from_env() -> Result<Self> {
        let certs_dir = env::current_exe()?
            .parent()
            .map(|dir| dir.join("certs"))
            .unwrap_or_else(|| PathBuf::from("certs"));

        let cert_path = env::var_os(CERT_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| certs_dir.join("localhost.pem"));
        let key_path = env::var_os(KEY_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| certs_dir.join("localhost-key.pem"));

        Ok(Self::default()
            .with_cert_path(cert_path)
            .with_key_path(key_path))
    }

    /// Set the certificate path
    pub fn with_cert_path(mut self, path: PathBuf) -> Self {
        self.cert_path = path;
        self
    }

    /// Set the key path
    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = path;
        self
    }

    /// Set the maximum message size
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Fails unless the process was launched by Terraform.
pub fn check_magic_cookie() -> Result<()> {
    match env::var(MAGIC_COOKIE_KEY) {
        Ok(value) if value == MAGIC_COOKIE_VALUE => Ok(()),
        _ => Err(TfplugError::ServerError(
            "This binary is a plugin. These are not meant to be executed directly. \
             Please execute the program that consumes these plugins, which will \
             load any plugins automatically"
                .to_string(),
        )),
    }
}

/// Main entry point for running a provider
pub async fn serve<P: ProviderV2 + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    check_magic_cookie()?;

    tracing::debug!(
        cert = %config.cert_path.display(),
        key = %config.key_path.display(),
        "starting provider server"
    );

    let server = ProviderServer::new(provider, config.cert_path, config.key_path)
        .with_max_message_size(config.max_message_size);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut task = tokio::spawn(server.run_with_shutdown(async {
        let _ = shutdown_rx.await;
    }));

    tokio::select! {
        joined = &mut task => return flatten(joined),
        _ = tokio::signal::ctrl_c() => {}
    }

    tracing::info!("interrupt received, shutting down");
    let _ = shutdown_tx.send(());
    match tokio::time::timeout(config.shutdown_timeout, task).await {
        Ok(joined) => flatten(joined),
        Err(_) => {
            tracing::warn!(
                timeout = ?config.shutdown_timeout,
                "in-flight requests did not finish before shutdown timeout"
            );
            Ok(())
        }
    }
}

fn flatten(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    joined.map_err(|e| TfplugError::ServerError(e.to_string()))?
}

/// Convenience function to run a provider with certificates from the environment
pub async fn serve_default<P: ProviderV2 + 'static>(provider: P) -> Result<()> {
    serve(provider, ServerConfig::from_env()?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn builder_overrides_defaults() {
        let config = ServerConfig::new()
            .with_cert_path(PathBuf::from("/tmp/cert.pem"))
            .with_key_path(PathBuf::from("/tmp/key.pem"))
            .with_max_message_size(1024)
            .with_shutdown_timeout(Duration::from_secs(5));

        assert_eq!(config.cert_path, PathBuf::from("/tmp/cert.pem"));
        assert_eq!(config.key_path, PathBuf::from("/tmp/key.pem"));
        assert_eq!(config.max_message_size, 1024);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn from_env_reads_certificate_paths() {
        env::set_var(CERT_PATH_ENV, "/etc/tf/cert.pem");
        env::set_var(KEY_PATH_ENV, "/etc/tf/key.pem");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.cert_path, PathBuf::from("/etc/tf/cert.pem"));
        assert_eq!(config.key_path, PathBuf::from("/etc/tf/key.pem"));

        env::remove_var(CERT_PATH_ENV);
        env::remove_var(KEY_PATH_ENV);
    }

    #[test]
    #[serial]
    fn magic_cookie_must_match() {
        env::remove_var(MAGIC_COOKIE_KEY);
        assert!(check_magic_cookie().is_err());

        env::set_var(MAGIC_COOKIE_KEY, "wrong");
        assert!(check_magic_cookie().is_err());

        env::set_var(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE);
        assert!(check_magic_cookie().is_ok());
        env::remove_var(MAGIC_COOKIE_KEY);
    }
}
