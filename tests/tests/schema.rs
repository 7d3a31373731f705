//! Schema reset against a real ClickHouse server.
//!
//! Requires Docker to be running for the ClickHouse testcontainer.

use clickhouse_client::schema::{tables, STAGING_EVENTS, USERS};
use clickhouse_client::{count_rows, list_tables, run_steps, table_columns, table_row_counts};
use etl_core::{Phase, Step};
use integration_tests::{fixtures, setup::TestContext};
use pipeline::{drop_tables, insert_tables, reset_schema};

#[tokio::test]
async fn test_reset_creates_seven_empty_tables() {
    let ctx = TestContext::new().await;

    let mut expected: Vec<_> = tables().iter().map(|t| t.name.to_string()).collect();
    expected.sort();
    let existing = list_tables(&ctx.clickhouse).await.expect("List failed");
    assert_eq!(existing, expected);

    for (table, rows) in table_row_counts(&ctx.clickhouse, &tables())
        .await
        .expect("Count failed")
    {
        assert_eq!(rows, 0, "{} should be empty after reset", table);
    }
}

#[tokio::test]
async fn test_created_columns_match_catalog() {
    let ctx = TestContext::new().await;

    for table in tables() {
        let columns: Vec<_> = table_columns(&ctx.clickhouse, table.name)
            .await
            .expect("Column query failed")
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(columns, table.columns, "column mismatch in {}", table.name);
    }
}

#[tokio::test]
async fn test_reset_twice_succeeds_and_clears_data() {
    let ctx = TestContext::new().await;

    fixtures::insert_events(
        &ctx.clickhouse,
        &[fixtures::play(7, "Artist A", "Song X", fixtures::MONDAY_10AM_MS, "free")],
    )
    .await;
    insert_tables(&ctx.clickhouse).await.expect("Transform failed");
    assert_eq!(count_rows(&ctx.clickhouse, &USERS).await.unwrap(), 1);

    reset_schema(&ctx.config).await.expect("Second reset failed");

    assert_eq!(count_rows(&ctx.clickhouse, &STAGING_EVENTS).await.unwrap(), 0);
    assert_eq!(count_rows(&ctx.clickhouse, &USERS).await.unwrap(), 0);
}

#[tokio::test]
async fn test_drop_skips_absent_tables() {
    let ctx = TestContext::new().await;

    drop_tables(&ctx.clickhouse).await.expect("First drop failed");
    let reports = drop_tables(&ctx.clickhouse)
        .await
        .expect("Dropping absent tables failed");

    assert_eq!(reports.len(), 7);
    assert!(list_tables(&ctx.clickhouse).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_step_aborts_rest_and_keeps_earlier_steps() {
    let ctx = TestContext::new().await;

    let steps = vec![
        Step::new(
            Phase::CreateTables,
            "create before_failure",
            "CREATE TABLE `before_failure` (id Int32) ENGINE = MergeTree() ORDER BY id",
        ),
        Step::new(Phase::CreateTables, "create broken", "CREATE TABLE `broken` (id NoSuchType)"),
        Step::new(
            Phase::CreateTables,
            "create after_failure",
            "CREATE TABLE `after_failure` (id Int32) ENGINE = MergeTree() ORDER BY id",
        ),
    ];

    let err = run_steps(&ctx.clickhouse, &steps).await.unwrap_err();
    assert_eq!(err.failed_step(), Some("create broken"));
    assert_eq!(err.error_code(), Some("DB_002"));

    let existing = list_tables(&ctx.clickhouse).await.expect("List failed");
    assert!(
        existing.iter().any(|t| t == "before_failure"),
        "earlier step stays committed"
    );
    assert!(
        !existing.iter().any(|t| t == "after_failure"),
        "later step never runs"
    );
}
