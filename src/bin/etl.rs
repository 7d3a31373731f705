//! Loads the staging tables from S3, then fills the star schema.
//!
//! Run `create-tables` first; this binary never creates or clears tables.

use anyhow::{Context, Result};
use pipeline::{run_etl, PipelineConfig};
use telemetry::{init_tracing_from_env, metrics};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("etl v{}", env!("CARGO_PKG_VERSION"));

    let config = PipelineConfig::load().context("Failed to load configuration")?;

    let result = run_etl(&config).await;
    metrics().snapshot().log();

    match result {
        Ok(summary) => {
            info!(
                steps = summary.steps.len(),
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "ETL finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, step = e.failed_step().unwrap_or("-"), "ETL failed");
            Err(e).context("ETL run failed")
        }
    }
}
