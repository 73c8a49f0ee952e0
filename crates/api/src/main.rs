//! OBD-II Diagnostics Dashboard - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logging(&config)?;

    info!("=== OBD-II Diagnostics Dashboard v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Starting in {} mode...",
        if config.session.use_mock_mode { "mock" } else { "adapter" }
    );

    // The stock binary ships without an adapter library
    run_server(config, None).await
}
