//! Sequential step runner.
//!
//! Steps run one at a time on the single client, each awaited to
//! completion before the next is sent. ClickHouse commits every DDL and
//! `INSERT ... SELECT` when it returns, so a failure at step k leaves steps
//! 1..k-1 applied. Nothing is retried.

use crate::client::ClickHouseClient;
use etl_core::{Error, Result, Step};
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::{debug, error, info, info_span, Instrument};

/// Outcome of one successful step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub name: String,
    pub elapsed: Duration,
}

/// Runs a single step.
pub async fn execute_step(client: &ClickHouseClient, step: &Step) -> Result<StepReport> {
    let span = info_span!("step", phase = %step.phase, name = %step.name);
    run(client, step).instrument(span).await
}

async fn run(client: &ClickHouseClient, step: &Step) -> Result<StepReport> {
    if step.placeholder_count() != step.binds.len() {
        return Err(Error::step(
            step.phase,
            &step.name,
            format!(
                "statement has {} placeholders but {} bound values",
                step.placeholder_count(),
                step.binds.len()
            ),
        ));
    }

    metrics().steps_started.inc();
    info!("Running step");
    debug!(sql = %step.sql, "Statement");

    let started = Instant::now();

    let mut query = client.inner().query(&step.sql);
    for value in &step.binds {
        query = query.bind(value.as_str());
    }
    let result = query.execute().await;

    let elapsed = started.elapsed();
    metrics()
        .step_latency_ms
        .observe(elapsed.as_millis().try_into().unwrap_or(u64::MAX));

    match result {
        Ok(()) => {
            metrics().steps_succeeded.inc();
            info!(elapsed_ms = elapsed.as_millis() as u64, "Step complete");
            Ok(StepReport {
                name: step.name.clone(),
                elapsed,
            })
        }
        Err(e) => {
            metrics().steps_failed.inc();
            error!(error = %e, elapsed_ms = elapsed.as_millis() as u64, "Step failed");
            Err(Error::step(step.phase, &step.name, e.to_string()))
        }
    }
}

/// Runs steps in order, stopping at the first failure.
pub async fn run_steps(client: &ClickHouseClient, steps: &[Step]) -> Result<Vec<StepReport>> {
    let mut reports = Vec::with_capacity(steps.len());
    for step in steps {
        reports.push(execute_step(client, step).await?);
    }
    Ok(reports)
}
