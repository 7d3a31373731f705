//! Telemetry for the song-play ETL.
//!
//! Structured logs go through `tracing`; per-run step counters and
//! latencies are kept in-process and logged as a snapshot when a driver
//! finishes.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
