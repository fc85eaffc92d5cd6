use sqlx::ConnectOptions;
use sqlx::postgres::{
    PgConnectOptions,
    PgPool,
    PgPoolOptions,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::log::LevelFilter;

use crate::config::Config;

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    let connect_options = PgConnectOptions::from_str(&config.database_url)?
        .log_slow_statements(LevelFilter::Warn, Duration::from_secs(5));

    // Every worker may look up its prior record at the same time
    PgPoolOptions::new()
        .max_connections(config.worker_count as u32 + 1)
        .acquire_timeout(config.request_timeout)
        .connect_with(connect_options)
        .await
}
