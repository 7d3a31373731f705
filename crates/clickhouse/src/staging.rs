//! Bulk loads from S3 into the staging tables.
//!
//! Each load is a single `INSERT INTO <staging> SELECT ... FROM s3(...)`
//! so the server reads the bucket directly. Bucket URLs, the structure
//! string and the role ARN are bound parameters; the statement text that
//! gets logged never contains them.

use crate::client::quote_identifier;
use crate::config::{Credentials, SourceConfig};
use crate::schema::{Table, STAGING_EVENTS, STAGING_SONGS};
use etl_core::{Error, JsonPaths, Phase, Result, S3Location, Step};
use tracing::{debug, info};

/// Width string columns are cut to when truncation is on.
pub const DEFAULT_COLUMN_WIDTH: usize = 256;

/// How a staging column is parsed from its source value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Int32,
    Int64,
    Float64,
}

/// Format-tolerance options for a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Cut string values longer than this many characters.
    pub truncate_columns: Option<usize>,
    /// Load blank or empty strings as NULL.
    pub blanks_as_null: bool,
}

impl LoadOptions {
    /// Tolerant options used for the song metadata.
    pub fn tolerant() -> Self {
        Self {
            truncate_columns: Some(DEFAULT_COLUMN_WIDTH),
            blanks_as_null: true,
        }
    }
}

/// staging_events columns with the JSON member each is read from by default.
const EVENT_FIELDS: [(&str, &str, FieldType); 18] = [
    ("artist", "artist", FieldType::Text),
    ("aut", "auth", FieldType::Text),
    ("firstname", "firstName", FieldType::Text),
    ("gender", "gender", FieldType::Text),
    ("iteminsession", "itemInSession", FieldType::Int32),
    ("lastname", "lastName", FieldType::Text),
    ("length", "length", FieldType::Float64),
    ("level", "level", FieldType::Text),
    ("location", "location", FieldType::Text),
    ("method", "method", FieldType::Text),
    ("page", "page", FieldType::Text),
    ("registration", "registration", FieldType::Text),
    ("sessionid", "sessionId", FieldType::Int32),
    ("song", "song", FieldType::Text),
    ("status", "status", FieldType::Int32),
    ("ts", "ts", FieldType::Int64),
    ("useragent", "userAgent", FieldType::Text),
    ("userid", "userId", FieldType::Int32),
];

/// staging_songs columns; the song files use the column names as keys.
const SONG_FIELDS: [(&str, FieldType); 10] = [
    ("song_id", FieldType::Text),
    ("artist_id", FieldType::Text),
    ("artist_latitude", FieldType::Float64),
    ("artist_longitude", FieldType::Float64),
    ("artist_location", FieldType::Text),
    ("artist_name", FieldType::Text),
    ("duration", FieldType::Float64),
    ("num_songs", FieldType::Int32),
    ("title", FieldType::Text),
    ("year", FieldType::Int32),
];

/// Which JSON member feeds each staging_events column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMapping {
    sources: Vec<String>,
}

impl EventMapping {
    /// The mapping the event logs are published with.
    pub fn builtin() -> Self {
        Self {
            sources: EVENT_FIELDS.iter().map(|(_, src, _)| src.to_string()).collect(),
        }
    }

    /// Builds a mapping from a JSONPaths document, one path per column.
    pub fn from_jsonpaths(paths: &JsonPaths) -> Result<Self> {
        if paths.len() != EVENT_FIELDS.len() {
            return Err(Error::source(format!(
                "JSONPaths lists {} paths but {} has {} columns",
                paths.len(),
                STAGING_EVENTS.name,
                EVENT_FIELDS.len()
            )));
        }
        Ok(Self {
            sources: paths.fields().to_vec(),
        })
    }

    /// Source member for each column, in column order.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// `structure` argument for the reader: every distinct source member
    /// read as a nullable string, parsed per column in the SELECT.
    pub fn structure(&self) -> String {
        let mut seen: Vec<&str> = Vec::with_capacity(self.sources.len());
        for src in &self.sources {
            if !seen.contains(&src.as_str()) {
                seen.push(src);
            }
        }
        seen.iter()
            .map(|src| format!("{} Nullable(String)", quote_identifier(src)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for EventMapping {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolves the events field mapping from `S3.LOG_JSONPATH`.
///
/// The document may be a local file, an `http(s)://` URL or an `s3://`
/// URI; S3 documents are fetched unsigned, so the object must be public.
pub async fn resolve_event_mapping(sources: &SourceConfig) -> Result<EventMapping> {
    let Some(location) = sources.jsonpath_location() else {
        debug!("Using built-in staging_events field mapping");
        return Ok(EventMapping::builtin());
    };

    let text = if let Ok(s3) = S3Location::parse(location) {
        fetch(&s3.https_url(&sources.region)).await?
    } else if location.starts_with("http://") || location.starts_with("https://") {
        fetch(location).await?
    } else {
        tokio::fs::read_to_string(location).await.map_err(|e| {
            Error::source(format!("cannot read JSONPaths file '{}': {}", location, e))
        })?
    };

    let paths = JsonPaths::parse(&text)?;
    let mapping = EventMapping::from_jsonpaths(&paths)?;
    info!(location = %location, fields = paths.len(), "Loaded JSONPaths mapping");
    Ok(mapping)
}

async fn fetch(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url)
        .map_err(|e| Error::source(format!("invalid JSONPaths URL '{}': {}", url, e)))?;

    let resp = reqwest::get(parsed)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::source(format!("cannot fetch JSONPaths '{}': {}", url, e)))?;

    resp.text()
        .await
        .map_err(|e| Error::source(format!("cannot read JSONPaths '{}': {}", url, e)))
}

/// Step loading the event logs into staging_events.
pub fn load_events_step(
    sources: &SourceConfig,
    credentials: &Credentials,
    mapping: &EventMapping,
) -> Result<Step> {
    let location = S3Location::parse(&sources.log_data)?;

    let (reader, binds) = s3_reader(
        location.load_url(&sources.region),
        Some(mapping.structure()),
        credentials,
    );
    let sql = events_insert_sql(mapping, &reader);

    Ok(with_binds(
        Step::new(Phase::LoadStaging, format!("load {}", STAGING_EVENTS.name), sql),
        binds,
    ))
}

/// Step loading the song metadata into staging_songs.
///
/// The reader infers the file schema; columns are selected by name and
/// the tolerant options apply.
pub fn load_songs_step(sources: &SourceConfig, credentials: &Credentials) -> Result<Step> {
    let location = S3Location::parse(&sources.song_data)?;

    let (reader, binds) = s3_reader(location.load_url(&sources.region), None, credentials);
    let sql = songs_insert_sql(&reader);

    Ok(with_binds(
        Step::new(Phase::LoadStaging, format!("load {}", STAGING_SONGS.name), sql),
        binds,
    ))
}

/// `INSERT ... SELECT` into staging_events from `reader`, a table function
/// yielding the members named by `mapping` as nullable strings.
pub fn events_insert_sql(mapping: &EventMapping, reader: &str) -> String {
    let options = LoadOptions::default();
    let select = EVENT_FIELDS
        .iter()
        .zip(mapping.sources())
        .map(|((_, _, ty), src)| column_expr(&quote_identifier(src), *ty, &options))
        .collect::<Vec<_>>();

    format!(
        "INSERT INTO {} ({})\nSELECT\n    {}\nFROM {}\nSETTINGS input_format_skip_unknown_fields = 1, input_format_json_read_numbers_as_strings = 1",
        STAGING_EVENTS.ident(),
        column_list(&STAGING_EVENTS),
        select.join(",\n    "),
        reader
    )
}

/// `INSERT ... SELECT` into staging_songs from `reader`, a table function
/// whose schema is inferred from the song files.
pub fn songs_insert_sql(reader: &str) -> String {
    let options = LoadOptions::tolerant();
    let select = SONG_FIELDS
        .iter()
        .map(|(name, ty)| {
            column_expr(&format!("toString({})", quote_identifier(name)), *ty, &options)
        })
        .collect::<Vec<_>>();

    format!(
        "INSERT INTO {} ({})\nSELECT\n    {}\nFROM {}",
        STAGING_SONGS.ident(),
        column_list(&STAGING_SONGS),
        select.join(",\n    "),
        reader
    )
}

/// Both load steps, events first.
pub fn load_steps(
    sources: &SourceConfig,
    credentials: &Credentials,
    mapping: &EventMapping,
) -> Result<Vec<Step>> {
    Ok(vec![
        load_events_step(sources, credentials, mapping)?,
        load_songs_step(sources, credentials)?,
    ])
}

/// `s3(...)` table function call and the values for its placeholders.
fn s3_reader(
    url: String,
    structure: Option<String>,
    credentials: &Credentials,
) -> (String, Vec<String>) {
    let mut args = vec!["?"];
    let mut binds = vec![url];

    if matches!(credentials, Credentials::NoSign) {
        args.push("NOSIGN");
    }

    args.push("'JSONEachRow'");

    if let Some(structure) = structure {
        args.push("?");
        binds.push(structure);
    }

    if let Credentials::Role { arn } = credentials {
        args.push("extra_credentials(role_arn = ?)");
        binds.push(arn.clone());
    }

    (format!("s3({})", args.join(", ")), binds)
}

/// Expression turning a raw source value into a staging column value.
fn column_expr(source: &str, ty: FieldType, options: &LoadOptions) -> String {
    match ty {
        FieldType::Text => {
            let mut expr = source.to_string();
            if options.blanks_as_null {
                expr = format!("if(empty(trimBoth({0})), NULL, {0})", expr);
            }
            if let Some(width) = options.truncate_columns {
                expr = format!("substringUTF8({}, 1, {})", expr, width);
            }
            expr
        }
        FieldType::Int32 => format!("toInt32OrNull({})", source),
        FieldType::Int64 => format!("toInt64OrNull({})", source),
        FieldType::Float64 => format!("toFloat64OrNull({})", source),
    }
}

fn column_list(table: &Table) -> String {
    table.columns.join(", ")
}

fn with_binds(mut step: Step, binds: Vec<String>) -> Step {
    for value in binds {
        step = step.bind(value);
    }
    step
}
