//! Drops and recreates the staging and warehouse tables.

use anyhow::{Context, Result};
use pipeline::{reset_schema, PipelineConfig};
use telemetry::{init_tracing_from_env, metrics};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("create-tables v{}", env!("CARGO_PKG_VERSION"));

    let config = PipelineConfig::load().context("Failed to load configuration")?;

    let result = reset_schema(&config).await;
    metrics().snapshot().log();

    match result {
        Ok(steps) => {
            info!(steps = steps.len(), "All tables recreated");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, step = e.failed_step().unwrap_or("-"), "Schema reset failed");
            Err(e).context("Failed to reset schema")
        }
    }
}
