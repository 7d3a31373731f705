//! Pipeline configuration.
//!
//! Read once at process start from an INI file (`dwh.cfg` by default) and
//! passed to every driver. Sections and keys are matched case-insensitively:
//!
//! ```ini
//! [CLUSTER]
//! HOST=warehouse.example.com
//! DB_NAME=sparkify
//! DB_USER=etl
//! DB_PASSWORD=secret
//! DB_PORT=8123
//!
//! [IAM_ROLE]
//! ARN=arn:aws:iam::123456789012:role/dwhRole
//!
//! [S3]
//! LOG_DATA='s3://udacity-dend/log_data'
//! LOG_JSONPATH='s3://udacity-dend/log_json_path.json'
//! SONG_DATA='s3://udacity-dend/song_data'
//! ```
//!
//! Any key can be overridden from the environment as
//! `DWH_<SECTION>_<KEY>`, e.g. `DWH_CLUSTER_DB_PASSWORD`.

use clickhouse_client::{ClickHouseConfig, Credentials, SourceConfig};
use config::{File, FileFormat, Value};
use etl_core::error::ConfigErrorCode;
use etl_core::{Error, Result, DEFAULT_REGION};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Config file read when `DWH_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "dwh.cfg";

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "DWH_CONFIG";

/// Prefix for per-key environment overrides.
const ENV_PREFIX: &str = "DWH";

/// Every key the pipeline reads, by section, with accepted spellings.
/// The first spelling is canonical and names the environment override.
const KNOWN_KEYS: &[(&str, &str, &[&str])] = &[
    ("cluster", "host", &["host"]),
    ("cluster", "db_name", &["db_name", "dbname", "database"]),
    ("cluster", "db_user", &["db_user", "user"]),
    ("cluster", "db_password", &["db_password", "password"]),
    ("cluster", "db_port", &["db_port", "port"]),
    ("cluster", "secure", &["secure"]),
    ("iam_role", "arn", &["arn"]),
    ("s3", "log_data", &["log_data"]),
    ("s3", "log_jsonpath", &["log_jsonpath"]),
    ("s3", "song_data", &["song_data"]),
    ("s3", "region", &["region"]),
];

/// Everything a pipeline run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub warehouse: ClickHouseConfig,
    pub credentials: Credentials,
    pub sources: SourceConfig,
}

/// Section name -> key -> value, all names lower-cased.
type Sections = HashMap<String, HashMap<String, String>>;

impl PipelineConfig {
    /// Loads from `$DWH_CONFIG` or `./dwh.cfg`, with environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::from_file(&path, |name| std::env::var(name).ok())
    }

    /// Loads from an INI file; `env` resolves override variables.
    pub fn from_file(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::config(
                ConfigErrorCode::Unreadable,
                format!("cannot read config file '{}': {}", path.display(), e),
            )
        })?;
        Self::from_ini_str(&text, env)
    }

    /// Parses INI text; `env` resolves override variables.
    pub fn from_ini_str(text: &str, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut sections = parse_sections(text)?;
        apply_env_overrides(&mut sections, env);
        Self::from_sections(&sections)
    }

    fn from_sections(sections: &Sections) -> Result<Self> {
        let host = require(sections, "cluster", "host")?;
        let database = require(sections, "cluster", "db_name")?;
        let user = lookup(sections, "cluster", "db_user");
        let password = lookup(sections, "cluster", "db_password");
        let port = require(sections, "cluster", "db_port")?;
        let port: u16 = port.parse().map_err(|_| {
            Error::config(
                ConfigErrorCode::InvalidValue,
                format!("[CLUSTER] port '{}' is not a valid port number", port),
            )
        })?;
        let secure = match lookup(sections, "cluster", "secure") {
            Some(v) => parse_bool(&v).ok_or_else(|| {
                Error::config(
                    ConfigErrorCode::InvalidValue,
                    format!("[CLUSTER] secure '{}' is not a boolean", v),
                )
            })?,
            None => false,
        };

        let warehouse = ClickHouseConfig::from_cluster(&host, port, &database, user, password, secure);

        // The key must be present; an empty ARN means public buckets.
        if !is_present(sections, "iam_role", "arn") {
            return Err(Error::missing_key("iam_role", "arn"));
        }
        let credentials = Credentials::from_arn(lookup(sections, "iam_role", "arn").as_deref());

        let sources = SourceConfig {
            log_data: require(sections, "s3", "log_data")?,
            log_jsonpath: lookup(sections, "s3", "log_jsonpath"),
            song_data: require(sections, "s3", "song_data")?,
            region: lookup(sections, "s3", "region").unwrap_or_else(|| DEFAULT_REGION.to_string()),
        };

        Ok(Self {
            warehouse,
            credentials,
            sources,
        })
    }
}

fn parse_sections(text: &str) -> Result<Sections> {
    // The INI reader unescapes backslashes; values must reach us verbatim.
    let escaped = text.replace('\\', "\\\\");
    let raw = config::Config::builder()
        .add_source(File::from_str(&escaped, FileFormat::Ini))
        .build()
        .map_err(|e| {
            Error::config(
                ConfigErrorCode::Unreadable,
                format!("cannot parse config: {}", e),
            )
        })?;

    let top: HashMap<String, Value> = raw.try_deserialize().map_err(|e| {
        Error::config(
            ConfigErrorCode::Unreadable,
            format!("cannot parse config: {}", e),
        )
    })?;

    let mut sections = Sections::new();
    for (name, value) in top {
        // Keys outside any section are ignored
        let Ok(table) = value.into_table() else {
            continue;
        };
        let entries = sections.entry(name.to_lowercase()).or_default();
        for (key, value) in table {
            if let Ok(s) = value.into_string() {
                entries.insert(key.to_lowercase(), unquote(&s).to_string());
            }
        }
    }
    Ok(sections)
}

fn apply_env_overrides(sections: &mut Sections, env: impl Fn(&str) -> Option<String>) {
    for (section, canonical, spellings) in KNOWN_KEYS {
        let var = format!(
            "{}_{}_{}",
            ENV_PREFIX,
            section.to_uppercase(),
            canonical.to_uppercase()
        );
        if let Some(value) = env(&var) {
            let entries = sections.entry(section.to_string()).or_default();
            for spelling in spellings.iter() {
                entries.remove(*spelling);
            }
            entries.insert(canonical.to_string(), unquote(&value).to_string());
        }
    }
}

fn spellings(section: &str, key: &str) -> &'static [&'static str] {
    KNOWN_KEYS
        .iter()
        .find(|(s, k, _)| *s == section && *k == key)
        .map(|(_, _, spellings)| *spellings)
        .unwrap_or(&[])
}

/// True when any accepted spelling of `key` is set, even to nothing.
fn is_present(sections: &Sections, section: &str, key: &str) -> bool {
    sections
        .get(section)
        .is_some_and(|entries| spellings(section, key).iter().any(|s| entries.contains_key(*s)))
}

/// First non-empty value under any accepted spelling of `key`.
fn lookup(sections: &Sections, section: &str, key: &str) -> Option<String> {
    let entries = sections.get(section)?;

    spellings(section, key)
        .iter()
        .filter_map(|s| entries.get(*s))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn require(sections: &Sections, section: &str, key: &str) -> Result<String> {
    lookup(sections, section, key).ok_or_else(|| Error::missing_key(section, key))
}

fn unquote(value: &str) -> &str {
    let v = value.trim();
    for q in ['\'', '"'] {
        if v.len() >= 2 && v.starts_with(q) && v.ends_with(q) {
            return &v[1..v.len() - 1];
        }
    }
    v
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
