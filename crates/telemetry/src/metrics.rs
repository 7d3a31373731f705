//! Run metrics.
//!
//! Counts steps and records step latency for the current process. Each
//! driver logs a snapshot when it finishes, successful or not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for step latency.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 100ms, 500ms, 1s, 5s, 30s, 1m, 5m, 15m, 1h
    buckets: [AtomicU64; 10],
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 10] = [
        10, 100, 500, 1_000, 5_000, 30_000, 60_000, 300_000, 900_000, 3_600_000,
    ];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns (upper bound ms, count) pairs.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for a pipeline process.
#[derive(Debug, Default)]
pub struct Metrics {
    pub steps_started: Counter,
    pub steps_succeeded: Counter,
    pub steps_failed: Counter,

    /// Rows counted in the warehouse tables after a transform.
    pub warehouse_rows: Counter,

    pub step_latency_ms: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            steps_started: self.steps_started.get(),
            steps_succeeded: self.steps_succeeded.get(),
            steps_failed: self.steps_failed.get(),
            warehouse_rows: self.warehouse_rows.get(),
            step_latency_mean_ms: self.step_latency_ms.mean(),
            step_latency_max_ms: self.step_latency_ms.max(),
            total_step_time_ms: self.step_latency_ms.sum(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub steps_started: u64,
    pub steps_succeeded: u64,
    pub steps_failed: u64,
    pub warehouse_rows: u64,
    pub step_latency_mean_ms: f64,
    pub step_latency_max_ms: u64,
    pub total_step_time_ms: u64,
}

impl MetricsSnapshot {
    /// Logs the snapshot as one structured event.
    pub fn log(&self) {
        tracing::info!(
            steps_started = self.steps_started,
            steps_succeeded = self.steps_succeeded,
            steps_failed = self.steps_failed,
            warehouse_rows = self.warehouse_rows,
            step_latency_mean_ms = self.step_latency_mean_ms,
            step_latency_max_ms = self.step_latency_max_ms,
            total_step_time_ms = self.total_step_time_ms,
            "Run metrics"
        );
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
