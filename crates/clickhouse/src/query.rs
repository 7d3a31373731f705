//! Query functions for reading the warehouse back (run summary and tests).

use crate::client::ClickHouseClient;
use crate::schema::Table;
use chrono::{DateTime, TimeZone, Utc};
use clickhouse::Row;
use etl_core::{Error, Result};
use serde::Deserialize;

/// A column as reported by `system.columns`.
#[derive(Debug, Clone, Row, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

#[derive(Debug, Clone, Row, Deserialize)]
pub struct SongplayRow {
    pub songplay_id: String,
    /// Seconds since the epoch.
    pub start_time: u32,
    pub user_id: i32,
    pub level: Option<String>,
    pub song_id: String,
    pub artist_id: String,
    pub session_id: Option<i32>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl SongplayRow {
    pub fn start_time_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(i64::from(self.start_time), 0).single()
    }
}

#[derive(Debug, Clone, Row, Deserialize)]
pub struct UserRow {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
}

#[derive(Debug, Clone, Row, Deserialize)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: Option<i32>,
    pub duration: f64,
}

#[derive(Debug, Clone, Row, Deserialize)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Row, Deserialize)]
pub struct TimeRow {
    /// Seconds since the epoch.
    pub start_time: u32,
    pub hour: i32,
    pub day: i32,
    pub week: i32,
    pub month: i32,
    pub year: i32,
    pub weekday: i32,
}

#[derive(Debug, Clone, Row, Deserialize)]
struct TableName {
    name: String,
}

/// Names of the tables that exist in the client's database.
pub async fn list_tables(client: &ClickHouseClient) -> Result<Vec<String>> {
    let rows: Vec<TableName> = client
        .inner()
        .query("SELECT name FROM system.tables WHERE database = currentDatabase() ORDER BY name")
        .fetch_all()
        .await
        .map_err(|e| Error::query(format!("Query error: {}", e)))?;
    Ok(rows.into_iter().map(|r| r.name).collect())
}

/// Columns of a table, in declaration order.
pub async fn table_columns(client: &ClickHouseClient, table: &str) -> Result<Vec<ColumnInfo>> {
    client
        .inner()
        .query(
            "SELECT name, type FROM system.columns \
             WHERE database = currentDatabase() AND table = ? ORDER BY position",
        )
        .bind(table)
        .fetch_all()
        .await
        .map_err(|e| Error::query(format!("Query error: {}", e)))
}

/// Row count of one table.
pub async fn count_rows(client: &ClickHouseClient, table: &Table) -> Result<u64> {
    let sql = format!("SELECT count() FROM {}", table.ident());
    client
        .inner()
        .query(&sql)
        .fetch_one::<u64>()
        .await
        .map_err(|e| Error::query(format!("Query error on {}: {}", table.name, e)))
}

/// Row counts for the given tables, in order.
pub async fn table_row_counts(
    client: &ClickHouseClient,
    tables: &[Table],
) -> Result<Vec<(&'static str, u64)>> {
    let mut counts = Vec::with_capacity(tables.len());
    for table in tables {
        counts.push((table.name, count_rows(client, table).await?));
    }
    Ok(counts)
}

pub async fn fetch_songplays(client: &ClickHouseClient) -> Result<Vec<SongplayRow>> {
    client
        .inner()
        .query(
            "SELECT toString(songplay_id), toUnixTimestamp(start_time), user_id, level, \
             song_id, artist_id, session_id, location, user_agent \
             FROM `songplays` ORDER BY start_time, song_id",
        )
        .fetch_all()
        .await
        .map_err(|e| Error::query(format!("Query error: {}", e)))
}

pub async fn fetch_users(client: &ClickHouseClient) -> Result<Vec<UserRow>> {
    client
        .inner()
        .query("SELECT user_id, first_name, last_name, gender, level FROM `users` ORDER BY user_id")
        .fetch_all()
        .await
        .map_err(|e| Error::query(format!("Query error: {}", e)))
}

pub async fn fetch_songs(client: &ClickHouseClient) -> Result<Vec<SongRow>> {
    client
        .inner()
        .query("SELECT song_id, title, artist_id, year, duration FROM `songs` ORDER BY song_id")
        .fetch_all()
        .await
        .map_err(|e| Error::query(format!("Query error: {}", e)))
}

pub async fn fetch_artists(client: &ClickHouseClient) -> Result<Vec<ArtistRow>> {
    client
        .inner()
        .query(
            "SELECT artist_id, name, location, latitude, longitude \
             FROM `artists` ORDER BY artist_id",
        )
        .fetch_all()
        .await
        .map_err(|e| Error::query(format!("Query error: {}", e)))
}

pub async fn fetch_time(client: &ClickHouseClient) -> Result<Vec<TimeRow>> {
    client
        .inner()
        .query(
            "SELECT toUnixTimestamp(start_time), hour, day, week, month, year, weekday \
             FROM `time` ORDER BY start_time",
        )
        .fetch_all()
        .await
        .map_err(|e| Error::query(format!("Query error: {}", e)))
}

