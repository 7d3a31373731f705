//! The two drivers: reset the schema, and run load-then-transform.
//!
//! Each opens one client, runs its steps strictly in order and stops at the
//! first failure. The client is dropped on every exit path.

use crate::config::PipelineConfig;
use clickhouse_client::schema::{create_steps, drop_steps, warehouse_tables};
use clickhouse_client::staging::{load_steps, resolve_event_mapping};
use clickhouse_client::transform::transform_steps;
use clickhouse_client::{health, run_steps, table_row_counts, ClickHouseClient, StepReport};
use etl_core::Result;
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::{info, info_span, warn, Instrument};

/// What a completed pipeline run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub steps: Vec<StepReport>,
    /// Row count per warehouse table after the transforms, when readable.
    pub row_counts: Vec<(&'static str, u64)>,
    pub elapsed: Duration,
}

/// Opens a client and checks that the server answers.
pub async fn connect(config: &PipelineConfig) -> Result<ClickHouseClient> {
    let client = ClickHouseClient::new(config.warehouse.clone())?;
    health::ensure_connection(&client).await?;
    info!(url = %config.warehouse.url, database = %client.database(), "Connected");
    Ok(client)
}

/// Drops all seven tables, skipping any that are absent.
pub async fn drop_tables(client: &ClickHouseClient) -> Result<Vec<StepReport>> {
    run_steps(client, &drop_steps()).await
}

/// Creates all seven tables.
pub async fn create_tables(client: &ClickHouseClient) -> Result<Vec<StepReport>> {
    run_steps(client, &create_steps()).await
}

/// Drops then recreates every table, leaving all seven empty.
pub async fn reset_schema(config: &PipelineConfig) -> Result<Vec<StepReport>> {
    async {
        let client = connect(config).await?;
        health::ensure_database(&client).await?;

        let mut reports = drop_tables(&client).await?;
        reports.extend(create_tables(&client).await?);

        info!(steps = reports.len(), "Schema reset");
        Ok(reports)
    }
    .instrument(info_span!("reset_schema"))
    .await
}

/// Bulk-loads both staging tables from the configured sources.
pub async fn load_staging_tables(
    client: &ClickHouseClient,
    config: &PipelineConfig,
) -> Result<Vec<StepReport>> {
    let mapping = resolve_event_mapping(&config.sources).await?;
    let steps = load_steps(&config.sources, &config.credentials, &mapping)?;
    run_steps(client, &steps).await
}

/// Populates the five warehouse tables from staging.
pub async fn insert_tables(client: &ClickHouseClient) -> Result<Vec<StepReport>> {
    run_steps(client, &transform_steps()).await
}

/// Loads staging, then transforms. Expects the schema to exist.
pub async fn run_etl(config: &PipelineConfig) -> Result<RunSummary> {
    async {
        let started = Instant::now();
        let client = connect(config).await?;

        let mut steps = load_staging_tables(&client, config).await?;
        steps.extend(insert_tables(&client).await?);

        // Counting is informational; the run already succeeded.
        let row_counts = match table_row_counts(&client, &warehouse_tables()).await {
            Ok(counts) => counts,
            Err(e) => {
                warn!(error = %e, "Could not count warehouse rows");
                Vec::new()
            }
        };
        for (table, rows) in &row_counts {
            metrics().warehouse_rows.inc_by(*rows);
            info!(table, rows, "Table populated");
        }

        let elapsed = started.elapsed();
        info!(
            steps = steps.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "ETL complete"
        );

        Ok(RunSummary {
            steps,
            row_counts,
            elapsed,
        })
    }
    .instrument(info_span!("run_etl"))
    .await
}
