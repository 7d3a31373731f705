//! Staging load statements executed against a real ClickHouse server.
//!
//! The load SQL is run over inline `format(JSONEachRow, ...)` data in place
//! of the bucket reader, so the projections and format tolerance are
//! checked without S3. Requires Docker to be running for the ClickHouse
//! testcontainer.

use clickhouse::Row;
use clickhouse_client::staging::{
    events_insert_sql, load_steps, songs_insert_sql, EventMapping,
};
use clickhouse_client::{run_steps, Credentials, SourceConfig};
use etl_core::{Error, Phase, DEFAULT_REGION};
use integration_tests::fixtures::MONDAY_10AM_MS;
use integration_tests::setup::TestContext;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Row, Deserialize)]
struct StagedEvent {
    aut: Option<String>,
    firstname: Option<String>,
    sessionid: Option<i32>,
    ts: Option<i64>,
    userid: Option<i32>,
}

#[derive(Debug, Row, Deserialize)]
struct StagedSong {
    song_id: Option<String>,
    title: Option<String>,
    artist_location: Option<String>,
    artist_latitude: Option<f64>,
    year: Option<i32>,
}

fn json_lines(rows: &[serde_json::Value]) -> String {
    rows.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_events_load_maps_members_and_parses_numbers() {
    let ctx = TestContext::new().await;
    let mapping = EventMapping::builtin();

    let data = json_lines(&[
        json!({
            "artist": "Artist A", "auth": "Logged In", "firstName": "Lily",
            "page": "NextSong", "sessionId": 818, "ts": MONDAY_10AM_MS, "userId": 7
        }),
        // Logged-out events carry a blank user id
        json!({
            "auth": "Logged Out", "firstName": "", "page": "Home",
            "sessionId": 819, "ts": MONDAY_10AM_MS + 1000, "userId": ""
        }),
    ]);

    ctx.clickhouse
        .inner()
        .query(&events_insert_sql(&mapping, "format(JSONEachRow, ?, ?)"))
        .bind(mapping.structure())
        .bind(data)
        .execute()
        .await
        .expect("Events load failed");

    let rows: Vec<StagedEvent> = ctx
        .clickhouse
        .inner()
        .query("SELECT aut, firstname, sessionid, ts, userid FROM staging_events ORDER BY ts")
        .fetch_all()
        .await
        .expect("Query failed");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].aut.as_deref(), Some("Logged In"));
    assert_eq!(rows[0].firstname.as_deref(), Some("Lily"));
    assert_eq!(rows[0].sessionid, Some(818));
    assert_eq!(rows[0].ts, Some(MONDAY_10AM_MS));
    assert_eq!(rows[0].userid, Some(7));

    assert_eq!(rows[1].userid, None, "blank user id loads as NULL");
    // No blank-as-NULL tolerance on the event logs
    assert_eq!(rows[1].firstname.as_deref(), Some(""));
}

#[tokio::test]
async fn test_songs_load_nulls_blanks_and_truncates() {
    let ctx = TestContext::new().await;

    let long_location = "x".repeat(300);
    let data = json_lines(&[
        json!({
            "song_id": "X1", "artist_id": "ARA", "artist_latitude": 35.14968,
            "artist_longitude": -90.04892, "artist_location": long_location,
            "artist_name": "Artist A", "duration": 218.93179, "num_songs": 1,
            "title": "", "year": 1999
        }),
        json!({
            "song_id": "X2", "artist_id": "ARA", "artist_latitude": null,
            "artist_longitude": null, "artist_location": "",
            "artist_name": "Artist A", "duration": 100.5, "num_songs": 1,
            "title": "   ", "year": null
        }),
    ]);

    ctx.clickhouse
        .inner()
        .query(&songs_insert_sql("format(JSONEachRow, ?)"))
        .bind(data)
        .execute()
        .await
        .expect("Songs load failed");

    let rows: Vec<StagedSong> = ctx
        .clickhouse
        .inner()
        .query(
            "SELECT song_id, title, artist_location, artist_latitude, year \
             FROM staging_songs ORDER BY song_id",
        )
        .fetch_all()
        .await
        .expect("Query failed");

    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].song_id.as_deref(), Some("X1"));
    assert_eq!(rows[0].title, None, "empty string loads as NULL");
    assert_eq!(rows[0].artist_location.as_deref().map(str::len), Some(256));
    assert_eq!(rows[0].artist_latitude, Some(35.14968));
    assert_eq!(rows[0].year, Some(1999));

    assert_eq!(rows[1].title, None, "blank string loads as NULL");
    assert_eq!(rows[1].artist_location, None);
    assert_eq!(rows[1].artist_latitude, None);
    assert_eq!(rows[1].year, None);
}

#[tokio::test]
async fn test_unsigned_s3_load_is_accepted_by_the_server() {
    let ctx = TestContext::new().await;

    let bucket = format!("etl-missing-{}", Uuid::new_v4().simple());
    let sources = SourceConfig {
        log_data: format!("s3://{}/log_data", bucket),
        log_jsonpath: None,
        song_data: format!("s3://{}/song_data", bucket),
        region: DEFAULT_REGION.to_string(),
    };
    let steps = load_steps(&sources, &Credentials::NoSign, &EventMapping::builtin()).unwrap();

    // The bucket does not exist, so the read fails; the statement must
    // still parse and bind.
    let (phase, step, message) = match run_steps(&ctx.clickhouse, &steps).await {
        Err(Error::Step {
            phase,
            step,
            message,
        }) => (phase, step, message),
        other => panic!("expected a step failure, got {other:?}"),
    };
    assert_eq!(phase, Phase::LoadStaging);
    assert_eq!(step, "load staging_events");
    for rejected in [
        "SYNTAX_ERROR",
        "NUMBER_OF_ARGUMENTS_DOESNT_MATCH",
        "BAD_ARGUMENTS",
        "UNKNOWN_FUNCTION",
        "UNKNOWN_IDENTIFIER",
    ] {
        assert!(!message.contains(rejected), "statement rejected: {message}");
    }
}
