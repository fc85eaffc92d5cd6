use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::bonds::NewBondModel;
use super::snapshot_store::SnapshotStore;
use crate::bonds::Bond;
use crate::error::Result;

/// In-process snapshot store with the same keying rules as the Postgres table.
/// Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    rows: RwLock<Vec<Bond>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Inserts rows verbatim, bypassing the unique key. Lets tests build broken snapshots.
    pub async fn insert_raw(&self, bond: Bond) {
        self.rows.write().await.push(bond);
    }
}

fn same_key(row: &Bond, bond: &Bond) -> bool {
    row.ticker == bond.ticker && row.price == bond.price && row.net_yield == bond.net_yield
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn latest_by_ticker(&self, ticker: &str) -> Result<Option<Bond>> {
        let rows = self.rows.read().await;
        // Ties go to the row stored last
        let latest = rows
            .iter()
            .filter(|row| row.ticker == ticker)
            .fold(None::<&Bond>, |best, row| match best {
                Some(best) if best.fetch_timestamp > row.fetch_timestamp => Some(best),
                _ => Some(row),
            });
        Ok(latest.cloned())
    }

    async fn snapshot_at(&self, fetch_timestamp: DateTime<Utc>) -> Result<Vec<Bond>> {
        let rows = self.rows.read().await;
        let mut snapshot: Vec<Bond> = rows
            .iter()
            .filter(|row| row.fetch_timestamp == fetch_timestamp)
            .cloned()
            .collect();
        snapshot.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(snapshot)
    }

    async fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.rows.read().await.iter().map(|row| row.fetch_timestamp).max())
    }

    async fn previous_timestamp(&self, latest: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .map(|row| row.fetch_timestamp)
            .filter(|ts| *ts != latest)
            .max())
    }

    async fn upsert(&self, bond: &Bond) -> Result<()> {
        NewBondModel::from_bond(bond)?;
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|row| same_key(row, bond)) {
            Some(existing) => existing.fetch_timestamp = bond.fetch_timestamp,
            None => rows.push(Bond {
                notified: false,
                succeeded: true,
                ..bond.clone()
            }),
        }
        Ok(())
    }

    async fn mark_notified(&self, bond: &Bond) -> Result<()> {
        let mut rows = self.rows.write().await;
        for row in rows.iter_mut().filter(|row| same_key(row, bond)) {
            row.notified = true;
        }
        Ok(())
    }
}
