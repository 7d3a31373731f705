//! Object-store locations for the source datasets.
//!
//! Operators write bucket locations the way the AWS tooling prints them
//! (`s3://bucket/prefix`). The warehouse's `s3()` table function wants a
//! virtual-hosted HTTPS URL, optionally with a glob.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Region used when neither the URI nor the config names one.
pub const DEFAULT_REGION: &str = "us-west-2";

/// Glob appended to prefixes so every JSON object below them is read.
const PREFIX_GLOB: &str = "**.json";

/// Key suffixes that name a single data object.
const OBJECT_EXTENSIONS: [&str; 4] = [".json", ".jsonl", ".ndjson", ".gz"];

const S3_URL: &str = r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.*))?$";
const S3_VIRTUAL: &str =
    r"^https://(?P<bucket>[a-z0-9\-\.]+)\.s3[\.\-](?P<region>[\w\-]+)\.amazonaws\.com(/(?P<key>.*))?$";
const S3_PATH: &str =
    r"^https://s3[\.\-](?P<region>[\w\-]+)\.amazonaws\.com/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.*))?$";

/// Compiled location regexes, tried in order (lazy initialization).
static S3_REGEXES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(S3_URL).expect("valid S3 URL pattern"),
        Regex::new(S3_VIRTUAL).expect("valid S3 virtual-host pattern"),
        Regex::new(S3_PATH).expect("valid S3 path-style pattern"),
    ]
});

/// A bucket plus key (or key prefix).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
    /// Region embedded in an HTTPS URI, if any.
    pub region: Option<String>,
}

impl S3Location {
    /// Parses `s3://`, virtual-hosted and path-style HTTPS URIs.
    pub fn parse(uri: &str) -> Result<Self> {
        let uri = uri.trim().trim_matches('\'').trim_matches('"');

        for re in S3_REGEXES.iter() {
            if let Some(caps) = re.captures(uri) {
                let bucket = caps["bucket"].to_string();
                let key = caps
                    .name("key")
                    .map(|m| m.as_str().trim_start_matches('/').to_string())
                    .unwrap_or_default();
                let region = caps.name("region").map(|m| m.as_str().to_string());
                return Ok(Self {
                    bucket,
                    key,
                    region,
                });
            }
        }

        Err(Error::source(format!("not an S3 location: '{}'", uri)))
    }

    /// True when the key already carries a glob the warehouse will expand.
    pub fn has_glob(&self) -> bool {
        self.key.contains(['*', '?', '{'])
    }

    /// True when the key names a prefix rather than a single object.
    ///
    /// Only a last segment ending in a JSON data extension names an object;
    /// anything else (`log_data`, `events.2018`) is a prefix. A trailing
    /// `/` always means a prefix.
    pub fn is_prefix(&self) -> bool {
        if self.key.is_empty() || self.key.ends_with('/') {
            return true;
        }
        let last = self
            .key
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        !OBJECT_EXTENSIONS.iter().any(|ext| last.ends_with(ext))
    }

    /// Virtual-hosted HTTPS URL for the object or prefix itself.
    pub fn https_url(&self, default_region: &str) -> String {
        let region = self.region.as_deref().unwrap_or(default_region);
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, region, self.key
        )
    }

    /// URL to hand to the warehouse's bulk reader.
    ///
    /// Prefixes get a recursive `**.json` glob; explicit objects and keys
    /// that already contain a glob are passed through.
    pub fn load_url(&self, default_region: &str) -> String {
        let base = self.https_url(default_region);
        if self.has_glob() || !self.is_prefix() {
            return base;
        }
        if base.ends_with('/') {
            format!("{}{}", base, PREFIX_GLOB)
        } else {
            format!("{}/{}", base, PREFIX_GLOB)
        }
    }
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
