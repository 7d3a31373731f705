//! Common test setup functions.

use clickhouse_client::{ClickHouseClient, ClickHouseConfig, Credentials, SourceConfig};
use etl_core::DEFAULT_REGION;
use pipeline::{reset_schema, PipelineConfig};
use uuid::Uuid;

use crate::containers::TestContainers;

/// A ClickHouse server with a freshly reset, uniquely named database.
pub struct TestContext {
    pub containers: TestContainers,
    pub config: PipelineConfig,
    pub clickhouse: ClickHouseClient,
}

impl TestContext {
    /// Starts ClickHouse and runs a schema reset into a new database.
    pub async fn new() -> Self {
        let containers = TestContainers::start().await;

        let config = PipelineConfig {
            warehouse: ClickHouseConfig {
                url: containers.clickhouse_url.clone(),
                database: format!("etl_test_{}", Uuid::new_v4().simple()),
                username: containers.clickhouse_username.clone(),
                password: containers.clickhouse_password.clone(),
            },
            credentials: Credentials::NoSign,
            // Never read: the tests seed staging directly
            sources: SourceConfig {
                log_data: "s3://udacity-dend/log_data".to_string(),
                log_jsonpath: None,
                song_data: "s3://udacity-dend/song_data".to_string(),
                region: DEFAULT_REGION.to_string(),
            },
        };

        reset_schema(&config)
            .await
            .expect("Failed to reset schema");

        let clickhouse = ClickHouseClient::new(config.warehouse.clone())
            .expect("Failed to create ClickHouse client");

        Self {
            containers,
            config,
            clickhouse,
        }
    }
}
