//! ClickHouse health checks.

use crate::client::{quote_identifier, ClickHouseClient};
use etl_core::{Error, Result};
use tracing::{debug, info};

/// Fails with a connection error unless the server answers.
pub async fn ensure_connection(client: &ClickHouseClient) -> Result<()> {
    client
        .server_client()
        .query("SELECT 1")
        .fetch_one::<u8>()
        .await
        .map_err(|e| {
            Error::connection(format!(
                "cannot reach ClickHouse at {}: {}",
                client.config().url,
                e
            ))
        })?;

    debug!("ClickHouse connection healthy");
    Ok(())
}

/// Creates the configured database if it does not exist.
pub async fn ensure_database(client: &ClickHouseClient) -> Result<()> {
    let sql = format!(
        "CREATE DATABASE IF NOT EXISTS {}",
        quote_identifier(client.database())
    );
    client
        .server_client()
        .query(&sql)
        .execute()
        .await
        .map_err(|e| Error::connection(format!("cannot create database: {}", e)))?;

    info!(database = %client.database(), "Database ready");
    Ok(())
}
