//! Unified error types for the ETL pipeline.
//!
//! Error codes:
//! - CFG_001-003: Configuration errors
//! - SRC_001: Source descriptor errors (JSONPaths, object-store URIs)
//! - DB_001-003: Warehouse errors

use thiserror::Error;

use crate::step::Phase;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// CFG_001: Config file missing or unreadable
    Unreadable,
    /// CFG_002: Required section or key missing
    MissingKey,
    /// CFG_003: Value present but malformed
    InvalidValue,
}

impl ConfigErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unreadable => "CFG_001",
            Self::MissingKey => "CFG_002",
            Self::InvalidValue => "CFG_003",
        }
    }
}

/// Warehouse error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorCode {
    /// DB_001: Could not reach the warehouse
    ConnectionFailed,
    /// DB_002: A pipeline statement failed
    StatementFailed,
    /// DB_003: A read-back query failed
    QueryFailed,
}

impl DbErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConnectionFailed => "DB_001",
            Self::StatementFailed => "DB_002",
            Self::QueryFailed => "DB_003",
        }
    }
}

/// Unified error type for the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with code.
    #[error("[{code}] {message}")]
    Config { code: &'static str, message: String },

    /// Invalid source descriptor (bucket URI, JSONPaths document).
    #[error("[SRC_001] {0}")]
    Source(String),

    /// The warehouse could not be reached.
    #[error("[DB_001] {0}")]
    Connection(String),

    /// A named pipeline step failed; earlier steps stay committed.
    #[error("[DB_002] {phase} step '{step}' failed: {message}")]
    Step {
        phase: Phase,
        step: String,
        message: String,
    },

    /// A read-back query failed.
    #[error("[DB_003] {0}")]
    Query(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(code: ConfigErrorCode, msg: impl Into<String>) -> Self {
        Self::Config {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn missing_key(section: &str, key: &str) -> Self {
        Self::config(
            ConfigErrorCode::MissingKey,
            format!("missing key '{}' in section [{}]", key, section.to_uppercase()),
        )
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn step(phase: Phase, step: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Step {
            phase,
            step: step.into(),
            message: msg.into(),
        }
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Name of the step that failed, if this is a step failure.
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::Step { step, .. } => Some(step),
            _ => None,
        }
    }

    /// Get the error code.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Config { code, .. } => Some(code),
            Self::Source(_) => Some("SRC_001"),
            Self::Connection(_) => Some(DbErrorCode::ConnectionFailed.code()),
            Self::Step { .. } => Some(DbErrorCode::StatementFailed.code()),
            Self::Query(_) => Some(DbErrorCode::QueryFailed.code()),
        }
    }
}
