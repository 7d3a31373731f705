//! ClickHouse client wrapper.

use crate::config::ClickHouseConfig;
use clickhouse::Client;
use etl_core::{Error, Result};
use tracing::info;

/// Database every ClickHouse server has; used before the target exists.
const SYSTEM_DATABASE: &str = "default";

/// ClickHouse client bound to the warehouse database.
///
/// The pipeline owns exactly one of these per run; nothing is pooled.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(Error::connection("ClickHouse URL is empty"));
        }
        if config.database.trim().is_empty() {
            return Err(Error::connection("ClickHouse database name is empty"));
        }

        let inner = build_client(&config, &config.database);

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Ok(Self { inner, config })
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }

    pub fn database(&self) -> &str {
        &self.config.database
    }

    /// A client for the same server that does not require the target
    /// database to exist yet.
    pub fn server_client(&self) -> Client {
        build_client(&self.config, SYSTEM_DATABASE)
    }
}

fn build_client(config: &ClickHouseConfig, database: &str) -> Client {
    let mut client = Client::default()
        .with_url(&config.url)
        .with_database(database);

    if let Some(ref user) = config.username {
        client = client.with_user(user);
    }

    if let Some(ref pass) = config.password {
        client = client.with_password(pass);
    }

    client
}

/// Quotes an identifier for use in DDL.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
}
