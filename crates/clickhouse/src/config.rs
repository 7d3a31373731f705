//! ClickHouse connection and source dataset configuration.

use etl_core::DEFAULT_REGION;
use serde::{Deserialize, Serialize};

/// ClickHouse client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickHouseConfig {
    /// ClickHouse HTTP URL
    pub url: String,
    /// Database name
    #[serde(default = "default_database")]
    pub database: String,
    /// Username (optional)
    pub username: Option<String>,
    /// Password (optional)
    pub password: Option<String>,
}

fn default_database() -> String {
    "sparkify".to_string()
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            database: default_database(),
            username: None,
            password: None,
        }
    }
}

impl ClickHouseConfig {
    /// Builds a config from the `[CLUSTER]` connection parameters.
    pub fn from_cluster(
        host: &str,
        port: u16,
        database: &str,
        user: Option<String>,
        password: Option<String>,
        secure: bool,
    ) -> Self {
        let scheme = if secure { "https" } else { "http" };
        Self {
            url: format!("{}://{}:{}", scheme, host.trim(), port),
            database: database.trim().to_string(),
            username: user.filter(|u| !u.is_empty()),
            password: password.filter(|p| !p.is_empty()),
        }
    }
}

/// Credentials the warehouse uses to read the source buckets.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Assume this IAM role for the read.
    Role { arn: String },
    /// Unsigned requests; only works for public buckets.
    NoSign,
}

impl Credentials {
    /// A blank ARN means the buckets are public.
    pub fn from_arn(arn: Option<&str>) -> Self {
        match arn.map(str::trim).filter(|a| !a.is_empty()) {
            Some(arn) => Self::Role {
                arn: arn.to_string(),
            },
            None => Self::NoSign,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Role { .. } => f.write_str("Role { arn: <redacted> }"),
            Self::NoSign => f.write_str("NoSign"),
        }
    }
}

/// Object-store locations of the two source datasets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Event log files (`S3.LOG_DATA`)
    pub log_data: String,
    /// JSONPaths document for the event logs (`S3.LOG_JSONPATH`).
    /// `None` or `auto` uses the built-in field mapping.
    pub log_jsonpath: Option<String>,
    /// Song metadata files (`S3.SONG_DATA`)
    pub song_data: String,
    /// Region used to build bucket URLs
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl SourceConfig {
    /// The JSONPaths location, unless the built-in mapping is requested.
    pub fn jsonpath_location(&self) -> Option<&str> {
        self.log_jsonpath
            .as_deref()
            .map(|p| p.trim().trim_matches('\''))
            .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("auto"))
    }
}
