use aws::AwsProvider;
use tfplug::ServerConfig;
use tracing_subscriber::EnvFilter;

/// Terraform reads the handshake from stdout, so logs go to stderr.
fn init_logging() {
    let filter = ["TF_LOG_PROVIDER", "TF_LOG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|level| !level.is_empty()))
        .and_then(|level| EnvFilter::try_new(level.to_lowercase()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> tfplug::Result<()> {
    init_logging();

    let config = ServerConfig::from_env()?;
    tfplug::serve(AwsProvider::new(), config).await
}
