//! Core types for the song-play warehouse ETL.

pub mod error;
pub mod jsonpaths;
pub mod s3;
pub mod step;

pub use error::{Error, Result};
pub use jsonpaths::JsonPaths;
pub use s3::{S3Location, DEFAULT_REGION};
pub use step::{Phase, Step};
