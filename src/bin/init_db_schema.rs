use dotenvy::dotenv;
use eyre::Result;
use tracing::info;

use bond_yield_watcher::config::Config;
use bond_yield_watcher::db::{connection, schema};
use bond_yield_watcher::logging;

/// Creates the `bonds` table and its snapshot indexes, then exits
#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    logging::init_logging(env!("CARGO_BIN_NAME").to_string())?;

    let cfg = Config::load()?;
    let pool = connection::create_pool(&cfg).await?;
    schema::init_schema(&pool).await?;
    info!(max_connections = pool.options().get_max_connections(), "Bond snapshot schema ready");

    pool.close().await;
    Ok(())
}
