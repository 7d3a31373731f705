//! ClickHouse table schemas.
//!
//! Two staging tables hold the raw source rows; the star schema is one
//! fact table (`songplays`) and four dimensions (`users`, `songs`,
//! `artists`, `time`). Column names are the folded lower-case names the
//! downstream consumers query, so they are kept exactly as listed here.
//!
//! No table declares uniqueness: ClickHouse `ORDER BY` keys only sort.
//! Duplicate suppression happens in the transform statements.

use etl_core::{Phase, Step};

/// What a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Staging,
    Fact,
    Dimension,
}

/// A table in the warehouse catalog.
#[derive(Debug, Clone, Copy)]
pub struct Table {
    pub name: &'static str,
    pub kind: TableKind,
    pub columns: &'static [&'static str],
    pub create_sql: &'static str,
}

impl Table {
    /// Name quoted for use in statements.
    pub fn ident(&self) -> String {
        format!("`{}`", self.name)
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.ident())
    }
}

/// SQL for creating the staging_events table.
///
/// One row per logged user-activity event. Every column is nullable and
/// there is no key; duplicates are expected.
pub const CREATE_STAGING_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `staging_events` (
    artist Nullable(String),
    aut Nullable(String),
    firstname Nullable(String),
    gender Nullable(String),
    iteminsession Nullable(Int32),
    lastname Nullable(String),
    length Nullable(Float64),
    level Nullable(String),
    location Nullable(String),
    method Nullable(String),
    page Nullable(String),
    registration Nullable(String),
    sessionid Nullable(Int32),
    song Nullable(String),
    status Nullable(Int32),
    -- epoch milliseconds, kept raw
    ts Nullable(Int64),
    useragent Nullable(String),
    userid Nullable(Int32)
)
ENGINE = MergeTree()
ORDER BY tuple()
"#;

/// SQL for creating the staging_songs table.
pub const CREATE_STAGING_SONGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `staging_songs` (
    song_id Nullable(String),
    artist_id Nullable(String),
    artist_latitude Nullable(Float64),
    artist_longitude Nullable(Float64),
    artist_location Nullable(String),
    artist_name Nullable(String),
    duration Nullable(Float64),
    num_songs Nullable(Int32),
    title Nullable(String),
    year Nullable(Int32)
)
ENGINE = MergeTree()
ORDER BY tuple()
"#;

/// SQL for creating the songplays fact table.
///
/// `songplay_id` is generated by the server on insert. `start_time` is a
/// 32-bit `DateTime`: event times before 1970 or after 2106 saturate at
/// the range ends instead of mapping to epoch + ts/1000.
pub const CREATE_SONGPLAYS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `songplays` (
    songplay_id UUID DEFAULT generateUUIDv4(),
    -- whole seconds, 1970-01-01 to 2106-02-07 UTC
    start_time DateTime('UTC'),
    user_id Int32,
    level Nullable(String),
    song_id String,
    artist_id String,
    session_id Nullable(Int32),
    location Nullable(String),
    user_agent Nullable(String)
)
ENGINE = MergeTree()
ORDER BY start_time
"#;

/// SQL for creating the users dimension table.
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `users` (
    user_id String,
    first_name Nullable(String),
    last_name Nullable(String),
    gender Nullable(String),
    level Nullable(String)
)
ENGINE = MergeTree()
ORDER BY user_id
"#;

/// SQL for creating the songs dimension table.
pub const CREATE_SONGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `songs` (
    song_id String,
    title String,
    artist_id String,
    year Nullable(Int32),
    duration Float64
)
ENGINE = MergeTree()
ORDER BY song_id
"#;

/// SQL for creating the artists dimension table.
pub const CREATE_ARTISTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `artists` (
    artist_id String,
    name Nullable(String),
    location Nullable(String),
    latitude Nullable(Float64),
    longitude Nullable(Float64)
)
ENGINE = MergeTree()
ORDER BY artist_id
"#;

/// SQL for creating the time dimension table.
///
/// `start_time` has the same 1970 to 2106 range as `songplays.start_time`.
pub const CREATE_TIME_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS `time` (
    -- whole seconds, 1970-01-01 to 2106-02-07 UTC
    start_time DateTime('UTC'),
    hour Int32,
    day Int32,
    week Int32,
    month Int32,
    year Int32,
    weekday Int32
)
ENGINE = MergeTree()
ORDER BY start_time
"#;

pub const STAGING_EVENTS: Table = Table {
    name: "staging_events",
    kind: TableKind::Staging,
    columns: &[
        "artist",
        "aut",
        "firstname",
        "gender",
        "iteminsession",
        "lastname",
        "length",
        "level",
        "location",
        "method",
        "page",
        "registration",
        "sessionid",
        "song",
        "status",
        "ts",
        "useragent",
        "userid",
    ],
    create_sql: CREATE_STAGING_EVENTS_TABLE,
};

pub const STAGING_SONGS: Table = Table {
    name: "staging_songs",
    kind: TableKind::Staging,
    columns: &[
        "song_id",
        "artist_id",
        "artist_latitude",
        "artist_longitude",
        "artist_location",
        "artist_name",
        "duration",
        "num_songs",
        "title",
        "year",
    ],
    create_sql: CREATE_STAGING_SONGS_TABLE,
};

pub const SONGPLAYS: Table = Table {
    name: "songplays",
    kind: TableKind::Fact,
    columns: &[
        "songplay_id",
        "start_time",
        "user_id",
        "level",
        "song_id",
        "artist_id",
        "session_id",
        "location",
        "user_agent",
    ],
    create_sql: CREATE_SONGPLAYS_TABLE,
};

pub const USERS: Table = Table {
    name: "users",
    kind: TableKind::Dimension,
    columns: &["user_id", "first_name", "last_name", "gender", "level"],
    create_sql: CREATE_USERS_TABLE,
};

pub const SONGS: Table = Table {
    name: "songs",
    kind: TableKind::Dimension,
    columns: &["song_id", "title", "artist_id", "year", "duration"],
    create_sql: CREATE_SONGS_TABLE,
};

pub const ARTISTS: Table = Table {
    name: "artists",
    kind: TableKind::Dimension,
    columns: &["artist_id", "name", "location", "latitude", "longitude"],
    create_sql: CREATE_ARTISTS_TABLE,
};

pub const TIME: Table = Table {
    name: "time",
    kind: TableKind::Dimension,
    columns: &["start_time", "hour", "day", "week", "month", "year", "weekday"],
    create_sql: CREATE_TIME_TABLE,
};

/// All tables, in the order they are dropped and created.
pub fn tables() -> [Table; 7] {
    [
        STAGING_EVENTS,
        STAGING_SONGS,
        SONGPLAYS,
        USERS,
        SONGS,
        ARTISTS,
        TIME,
    ]
}

/// The star-schema tables the transform populates.
pub fn warehouse_tables() -> Vec<Table> {
    tables()
        .into_iter()
        .filter(|t| t.kind != TableKind::Staging)
        .collect()
}

/// One `DROP TABLE IF EXISTS` step per table.
pub fn drop_steps() -> Vec<Step> {
    tables()
        .iter()
        .map(|t| Step::new(Phase::DropTables, format!("drop {}", t.name), t.drop_sql()))
        .collect()
}

/// One `CREATE TABLE IF NOT EXISTS` step per table.
pub fn create_steps() -> Vec<Step> {
    tables()
        .iter()
        .map(|t| {
            Step::new(
                Phase::CreateTables,
                format!("create {}", t.name),
                t.create_sql.trim(),
            )
        })
        .collect()
}
