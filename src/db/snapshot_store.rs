use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::bonds::Bond;
use crate::error::Result;

/// Durable history of enriched bonds, one snapshot per fetch timestamp
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Most recent record for `ticker`, across all snapshots
    async fn latest_by_ticker(&self, ticker: &str) -> Result<Option<Bond>>;

    async fn snapshot_at(&self, fetch_timestamp: DateTime<Utc>) -> Result<Vec<Bond>>;

    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>>;

    /// Most recent timestamp that differs from `latest`
    async fn previous_timestamp(&self, latest: DateTime<Utc>) -> Result<Option<DateTime<Utc>>>;

    /// Keyed by (ticker, price, net_yield): an existing record only moves to the
    /// new fetch timestamp and keeps its notified flag
    async fn upsert(&self, bond: &Bond) -> Result<()>;

    async fn mark_notified(&self, bond: &Bond) -> Result<()>;
}
