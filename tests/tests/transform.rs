//! Staging-to-star-schema transforms against a real ClickHouse server.
//!
//! Staging is seeded directly; the S3 bulk load is not exercised here.
//! Requires Docker to be running for the ClickHouse testcontainer.

use chrono::{TimeZone, Utc};
use clickhouse_client::schema::SONGPLAYS;
use clickhouse_client::{
    count_rows, fetch_artists, fetch_songplays, fetch_songs, fetch_time, fetch_users,
};
use integration_tests::fixtures::{self, MONDAY_10AM_MS};
use integration_tests::setup::TestContext;
use pipeline::insert_tables;

#[tokio::test]
async fn test_play_joins_to_matching_song() {
    let ctx = TestContext::new().await;

    fixtures::insert_songs(
        &ctx.clickhouse,
        &[fixtures::song("X1", "Song X", "ARA", "Artist A")],
    )
    .await;
    fixtures::insert_events(
        &ctx.clickhouse,
        &[
            fixtures::play(7, "Artist A", "Song X", MONDAY_10AM_MS, "free"),
            // Same artist, unknown title
            fixtures::play(7, "Artist A", "Song Y", MONDAY_10AM_MS + 60_000, "free"),
            fixtures::page_view(7, "Home", MONDAY_10AM_MS + 120_000),
        ],
    )
    .await;

    insert_tables(&ctx.clickhouse).await.expect("Transform failed");

    let plays = fetch_songplays(&ctx.clickhouse).await.expect("Query failed");
    assert_eq!(plays.len(), 1, "only the matched play is kept");

    let play = &plays[0];
    assert_eq!(play.song_id, "X1");
    assert_eq!(play.artist_id, "ARA");
    assert_eq!(play.user_id, 7);
    assert_eq!(play.level.as_deref(), Some("free"));
    assert_eq!(play.session_id, Some(818));
    assert_eq!(
        play.start_time_utc(),
        Some(Utc.with_ymd_and_hms(2021, 3, 15, 10, 0, 0).unwrap())
    );
    assert!(!play.songplay_id.is_empty());
}

#[tokio::test]
async fn test_user_takes_latest_level() {
    let ctx = TestContext::new().await;

    fixtures::insert_events(
        &ctx.clickhouse,
        &[
            fixtures::play(7, "Artist A", "Song X", MONDAY_10AM_MS + 3_600_000, "paid"),
            fixtures::play(7, "Artist A", "Song X", MONDAY_10AM_MS, "free"),
            fixtures::play(9, "Artist A", "Song X", MONDAY_10AM_MS, "free"),
        ],
    )
    .await;

    insert_tables(&ctx.clickhouse).await.expect("Transform failed");

    let users = fetch_users(&ctx.clickhouse).await.expect("Query failed");
    assert_eq!(users.len(), 2, "one row per user");
    assert_eq!(users[0].user_id, "7");
    assert_eq!(users[0].level.as_deref(), Some("paid"));
    assert_eq!(users[0].first_name.as_deref(), Some("Lily"));
    assert_eq!(users[1].user_id, "9");
    assert_eq!(users[1].level.as_deref(), Some("free"));
}

#[tokio::test]
async fn test_artist_with_two_songs_appears_once() {
    let ctx = TestContext::new().await;

    fixtures::insert_songs(
        &ctx.clickhouse,
        &[
            fixtures::song("X1", "Song X", "ARA", "Artist A"),
            fixtures::song("X2", "Song Y", "ARA", "Artist A"),
            // Same song listed twice
            fixtures::song("X2", "Song Y", "ARA", "Artist A"),
        ],
    )
    .await;

    insert_tables(&ctx.clickhouse).await.expect("Transform failed");

    let artists = fetch_artists(&ctx.clickhouse).await.expect("Query failed");
    assert_eq!(artists.len(), 1);
    assert_eq!(artists[0].artist_id, "ARA");
    assert_eq!(artists[0].name.as_deref(), Some("Artist A"));
    assert_eq!(artists[0].location.as_deref(), Some("Memphis, TN"));

    let songs = fetch_songs(&ctx.clickhouse).await.expect("Query failed");
    let ids: Vec<_> = songs.iter().map(|s| s.song_id.as_str()).collect();
    assert_eq!(ids, vec!["X1", "X2"]);
    assert_eq!(songs[0].year, Some(1999));
}

#[tokio::test]
async fn test_time_splits_event_second_into_calendar_fields() {
    let ctx = TestContext::new().await;

    let mut no_ts = fixtures::page_view(7, "Logout", 0);
    no_ts["ts"] = serde_json::Value::Null;

    fixtures::insert_events(
        &ctx.clickhouse,
        &[
            fixtures::play(7, "Artist A", "Song X", MONDAY_10AM_MS, "free"),
            // Same second, different millisecond
            fixtures::play(9, "Artist B", "Song Z", MONDAY_10AM_MS + 250, "free"),
            no_ts,
        ],
    )
    .await;

    insert_tables(&ctx.clickhouse).await.expect("Transform failed");

    let rows = fetch_time(&ctx.clickhouse).await.expect("Query failed");
    assert_eq!(rows.len(), 1, "one row per distinct second, null ts skipped");

    let t = &rows[0];
    assert_eq!(i64::from(t.start_time) * 1000, MONDAY_10AM_MS);
    assert_eq!(t.hour, 10);
    assert_eq!(t.day, 15);
    assert_eq!(t.week, 11);
    assert_eq!(t.month, 3);
    assert_eq!(t.year, 2021);
    // Sunday = 0
    assert_eq!(t.weekday, 1);
}

#[tokio::test]
async fn test_rerun_without_reset_duplicates_facts() {
    let ctx = TestContext::new().await;

    fixtures::insert_songs(
        &ctx.clickhouse,
        &[fixtures::song("X1", "Song X", "ARA", "Artist A")],
    )
    .await;
    fixtures::insert_events(
        &ctx.clickhouse,
        &[fixtures::play(7, "Artist A", "Song X", MONDAY_10AM_MS, "free")],
    )
    .await;

    insert_tables(&ctx.clickhouse).await.expect("First transform failed");
    insert_tables(&ctx.clickhouse).await.expect("Second transform failed");

    assert_eq!(count_rows(&ctx.clickhouse, &SONGPLAYS).await.unwrap(), 2);
}
