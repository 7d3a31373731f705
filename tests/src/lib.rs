//! Shared harness for the ClickHouse-backed integration tests.
//!
//! Requires Docker, unless `ETL_TEST_CLICKHOUSE_URL` points at a running
//! server.

pub mod containers;
pub mod setup;
