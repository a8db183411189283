//! Describe-Image Server - Main Entry Point

use api::config::AppConfig;
use api::{init_logging, run_server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("=== Describe Image v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Model {} ({} policy), uploads staged in {}",
        config.model.path.display(),
        config.model.load_policy.as_str(),
        config.upload.dir.display()
    );

    run_server(config).await
}
