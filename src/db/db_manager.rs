use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use super::connection;
use super::schema;
use super::queries::bonds as bonds_queries;
use super::models::bonds::NewBondModel;
use super::snapshot_store::SnapshotStore;
use crate::bonds::Bond;
use crate::config::Config;
use crate::error::{PipelineError, Result};

/// Postgres-backed snapshot store
#[derive(Debug, Clone)]
pub struct DbManager {
    pub pool: PgPool,
}

impl DbManager {
    /// Creates a new database connection and initializes the schema
    pub async fn init(config: &Config) -> std::result::Result<Self, sqlx::Error> {
        let pool = connection::create_pool(config).await?;

        // Ensure schema is initialized (creates tables if needed)
        schema::init_schema(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl SnapshotStore for DbManager {
    async fn latest_by_ticker(&self, ticker: &str) -> Result<Option<Bond>> {
        Ok(bonds_queries::get_latest_bond_by_ticker(&self.pool, ticker)
            .await?
            .map(Bond::from))
    }

    #[instrument(skip(self))]
    async fn snapshot_at(&self, fetch_timestamp: DateTime<Utc>) -> Result<Vec<Bond>> {
        let rows = bonds_queries::get_bonds_at_timestamp(&self.pool, fetch_timestamp).await?;
        debug!(count = rows.len(), "Loaded snapshot");
        Ok(rows.into_iter().map(Bond::from).collect())
    }

    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(bonds_queries::get_latest_timestamp(&self.pool).await?)
    }

    async fn previous_timestamp(&self, latest: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        Ok(bonds_queries::get_latest_timestamp_excluding(&self.pool, latest).await?)
    }

    async fn upsert(&self, bond: &Bond) -> Result<()> {
        let model = NewBondModel::from_bond(bond)?;
        bonds_queries::upsert_bond(&self.pool, &model).await?;
        Ok(())
    }

    async fn mark_notified(&self, bond: &Bond) -> Result<()> {
        let net_yield = bond.net_yield.ok_or_else(|| {
            PipelineError::InvalidRecord(format!("{} has no net yield", bond.ticker))
        })?;
        let updated = bonds_queries::mark_bond_notified(&self.pool, &bond.ticker, bond.price, net_yield).await?;
        if updated == 0 {
            warn!(ticker = %bond.ticker, "No stored record matched notified bond");
        }
        Ok(())
    }
}
