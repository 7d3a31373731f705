//! JSONPaths field-mapping documents.
//!
//! A JSONPaths document lists, in target-column order, the JSON path each
//! column is read from:
//!
//! ```json
//! { "jsonpaths": ["$['artist']", "$['auth']", "$.firstName"] }
//! ```
//!
//! Only top-level members are supported; the event logs are flat.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::error::{Error, Result};

const MEMBER_PATH: &str =
    r#"^\$(?:\['(?P<quoted>[^']+)'\]|\["(?P<dquoted>[^"]+)"\]|\.(?P<bare>[A-Za-z_][A-Za-z0-9_]*))$"#;

/// Compiled member-path regex (lazy initialization).
static MEMBER_PATH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MEMBER_PATH).expect("valid JSONPath pattern"));

#[derive(Debug, Deserialize)]
struct Document {
    jsonpaths: Vec<String>,
}

/// Parsed JSONPaths document: source JSON member names in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPaths {
    fields: Vec<String>,
}

impl JsonPaths {
    /// Parses a JSONPaths document.
    pub fn parse(text: &str) -> Result<Self> {
        let doc: Document = serde_json::from_str(text)
            .map_err(|e| Error::source(format!("invalid JSONPaths document: {}", e)))?;

        if doc.jsonpaths.is_empty() {
            return Err(Error::source("JSONPaths document lists no paths"));
        }

        let fields = doc
            .jsonpaths
            .iter()
            .map(|path| parse_member(path))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { fields })
    }

    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Source member names, one per target column.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn parse_member(path: &str) -> Result<String> {
    let path = path.trim();
    let caps = MEMBER_PATH_REGEX.captures(path).ok_or_else(|| {
        Error::source(format!(
            "unsupported JSONPath '{}': only top-level members are allowed",
            path
        ))
    })?;

    let name = caps
        .name("quoted")
        .or_else(|| caps.name("dquoted"))
        .or_else(|| caps.name("bare"))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::source(format!("empty JSONPath member in '{}'", path)))?;

    Ok(name)
}
