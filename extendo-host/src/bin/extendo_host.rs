use extendo_host::{run_host, HostConfig, HostError};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), HostError> {
    dotenvy::dotenv().ok();
    // stdout carries native messaging frames.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let config = HostConfig::from_env()?;
    info!(store = %config.store_path.display(), "extendo host starting");
    run_host(config).await
}
