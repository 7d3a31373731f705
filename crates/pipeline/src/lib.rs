//! Configuration and drivers for the song-play ETL.
//!
//! `reset_schema` backs the `create-tables` binary; `run_etl` backs `etl`.

pub mod config;
pub mod drivers;

pub use config::{PipelineConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
pub use drivers::{
    connect, create_tables, drop_tables, insert_tables, load_staging_tables, reset_schema, run_etl,
    RunSummary,
};
