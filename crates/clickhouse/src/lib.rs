//! ClickHouse side of the song-play ETL: schema, bulk loads, transforms,
//! and the step runner that executes them.

pub mod client;
pub mod config;
pub mod executor;
pub mod health;
pub mod query;
pub mod schema;
pub mod staging;
pub mod transform;

pub use client::*;
pub use config::*;
pub use executor::{execute_step, run_steps, StepReport};
pub use query::*;
