use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::bonds::{ListingSource, WorkerPool};
use crate::db::SnapshotStore;
use crate::diff::{self, DiffReport, FilterCriteria};
use crate::error::Result;
use crate::notify::Notifier;

pub const FETCH_FAILED_ALERT: &str = "Failed to fetch bonds. Please check the logs.";
pub const DIFF_FAILED_ALERT: &str = "Error when calculating bonds. Possibly an unexpected duplicate";

/// Counters for one harvest-and-report cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub listed: usize,
    pub dropped_listings: usize,
    pub enriched: usize,
    pub failed: usize,
    pub new_reported: usize,
    pub improved_reported: usize,
}

/// Wires listing source, enrichment pool, snapshot store and notifier together
pub struct BondWatcher {
    listing_source: Arc<dyn ListingSource>,
    pool: WorkerPool,
    store: Arc<dyn SnapshotStore>,
    notifier: Arc<dyn Notifier>,
    criteria: FilterCriteria,
}

impl BondWatcher {
    pub fn new(
        listing_source: Arc<dyn ListingSource>,
        pool: WorkerPool,
        store: Arc<dyn SnapshotStore>,
        notifier: Arc<dyn Notifier>,
        criteria: FilterCriteria,
    ) -> Self {
        Self {
            listing_source,
            pool,
            store,
            notifier,
            criteria,
        }
    }

    /// Harvests listings, enriches them and stores them as the snapshot at `fetch_timestamp`
    #[instrument(skip(self), fields(on_close = true))]
    pub async fn update_bonds(&self, fetch_timestamp: DateTime<Utc>) -> Result<CycleSummary> {
        let listings = self.listing_source.fetch_listings(fetch_timestamp).await?;
        let listed = listings.bonds.len();

        let batch = self.pool.enrich(listings.bonds).await?;
        for bond in &batch.bonds {
            self.store.upsert(bond).await?;
        }
        info!(
            listed = listed,
            enriched = batch.bonds.len(),
            failed = batch.failed.len(),
            "Snapshot stored"
        );

        Ok(CycleSummary {
            listed,
            dropped_listings: listings.dropped,
            enriched: batch.bonds.len(),
            failed: batch.failed.len(),
            ..CycleSummary::default()
        })
    }

    /// Compares the latest snapshot with the most recent earlier one
    #[instrument(skip(self))]
    pub async fn find_interesting_bonds(&self, today: NaiveDate) -> Result<DiffReport> {
        let Some(latest_ts) = self.store.latest_timestamp().await? else {
            return Ok(DiffReport::default());
        };
        let latest = self.store.snapshot_at(latest_ts).await?;
        let previous = match self.store.previous_timestamp(latest_ts).await? {
            Some(previous_ts) => self.store.snapshot_at(previous_ts).await?,
            None => Vec::new(),
        };

        diff::diff_snapshots(latest, previous, &self.criteria, today)
    }

    /// Reports new bonds, then improved ones. Each is marked notified after the
    /// delivery attempt, whether or not it went through.
    #[instrument(skip_all, fields(new = report.new_bonds.len(), improved = report.improved_bonds.len()))]
    pub async fn send_notifications(&self, report: &DiffReport) -> (usize, usize) {
        let mut new_delivered = 0;
        for bond in &report.new_bonds {
            match self.notifier.notify_new(bond).await {
                Ok(()) => new_delivered += 1,
                Err(e) => warn!(ticker = %bond.ticker, error = %e, "Failed to deliver new bond notification"),
            }
            if let Err(e) = self.store.mark_notified(bond).await {
                error!(ticker = %bond.ticker, error = %e, "Failed to mark bond as notified");
            }
        }

        let mut improved_delivered = 0;
        for improved in &report.improved_bonds {
            match self.notifier.notify_improved(improved).await {
                Ok(()) => improved_delivered += 1,
                Err(e) => warn!(ticker = %improved.bond.ticker, error = %e, "Failed to deliver improved bond notification"),
            }
            if let Err(e) = self.store.mark_notified(&improved.bond).await {
                error!(ticker = %improved.bond.ticker, error = %e, "Failed to mark bond as notified");
            }
        }

        (new_delivered, improved_delivered)
    }

    /// One full cycle. Failures are logged and announced through the notifier
    /// before being handed back; the next cycle starts from a fresh snapshot.
    #[instrument(skip(self), fields(on_close = true))]
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Result<CycleSummary> {
        let mut summary = match self.update_bonds(now).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "Failed to update bonds");
                self.send_alert(FETCH_FAILED_ALERT).await;
                return Err(e);
            }
        };

        let report = match self.find_interesting_bonds(now.date_naive()).await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Failed to compare snapshots");
                self.send_alert(DIFF_FAILED_ALERT).await;
                return Err(e);
            }
        };

        let (new_reported, improved_reported) = self.send_notifications(&report).await;
        summary.new_reported = new_reported;
        summary.improved_reported = improved_reported;
        info!(?summary, "Cycle completed");
        Ok(summary)
    }

    async fn send_alert(&self, message: &str) {
        if let Err(e) = self.notifier.alert(message).await {
            warn!(error = %e, "Failed to deliver alert");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonds::{Bond, YieldQuote};
    use crate::db::MemorySnapshotStore;
    use crate::error::PipelineError;
    use crate::testing::{FakeEnrichmentClient, FakeListingSource, RecordingNotifier, enriched_bond, fast_policy, ts};
    use rust_decimal::dec;

    struct Harness {
        listings: Arc<FakeListingSource>,
        store: Arc<MemorySnapshotStore>,
        notifier: Arc<RecordingNotifier>,
        watcher: BondWatcher,
    }

    fn harness(client: FakeEnrichmentClient, listings: FakeListingSource, notifier: RecordingNotifier) -> Harness {
        let listings = Arc::new(listings);
        let store = Arc::new(MemorySnapshotStore::new());
        let notifier = Arc::new(notifier);
        let pool = WorkerPool::new(Arc::new(client), store.clone(), 2, fast_policy()).unwrap();
        let watcher = BondWatcher::new(
            listings.clone(),
            pool,
            store.clone(),
            notifier.clone(),
            FilterCriteria::new(dec!(2), dec!(15), 360).unwrap(),
        );
        Harness {
            listings,
            store,
            notifier,
            watcher,
        }
    }

    #[tokio::test]
    async fn first_cycle_reports_every_eligible_bond_once() {
        let client = FakeEnrichmentClient::new()
            .with_yield("AAA0130", YieldQuote::Available(dec!(6.5)))
            .with_yield("LOW0130", YieldQuote::Available(dec!(1.2)))
            .with_yield("NAV0130", YieldQuote::NotAvailable);
        let listings = FakeListingSource::new(&[
            ("AAA0130", dec!(100.5)),
            ("LOW0130", dec!(104)),
            ("NAV0130", dec!(99)),
        ]);
        let h = harness(client, listings, RecordingNotifier::default());

        let summary = h.watcher.run_cycle(ts("2024-03-04T09:00:00Z")).await.unwrap();
        assert_eq!(summary.enriched, 3);
        assert_eq!(summary.new_reported, 1);
        assert_eq!(*h.notifier.new_bonds.lock().unwrap(), vec!["AAA0130".to_string()]);

        // Nothing changed, nothing to report
        let summary = h.watcher.run_cycle(ts("2024-03-04T09:05:00Z")).await.unwrap();
        assert_eq!(summary.new_reported, 0);
        assert_eq!(summary.improved_reported, 0);
        assert_eq!(h.store.len().await, 3);
    }

    #[tokio::test]
    async fn price_drop_with_higher_yield_is_reported_as_improved() {
        let listings = FakeListingSource::new(&[("GTC0427", dec!(100))]);
        let h = harness(FakeEnrichmentClient::new(), listings, RecordingNotifier::default());
        h.watcher.run_cycle(ts("2024-03-04T09:00:00Z")).await.unwrap();

        // The fake calculator quotes 5.0 for every price; seed an improved quote directly
        h.listings.set(&[("GTC0427", dec!(98.4))]);
        let summary = h.watcher.update_bonds(ts("2024-03-04T09:05:00Z")).await.unwrap();
        assert_eq!(summary.enriched, 1);
        let improved = Bond {
            fetch_timestamp: ts("2024-03-04T09:10:00Z"),
            ..enriched_bond("GTC0427", dec!(97.9), dec!(5.6), chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
        };
        h.store.upsert(&improved).await.unwrap();

        let report = h.watcher.find_interesting_bonds(ts("2024-03-04T09:10:00Z").date_naive()).await.unwrap();
        assert!(report.new_bonds.is_empty());
        assert_eq!(report.improved_bonds.len(), 1);
        assert_eq!(report.improved_bonds[0].prev_net_yield, dec!(5.0));
        assert_eq!(report.improved_bonds[0].prev_price, dec!(98.4));

        let (_, improved_reported) = h.watcher.send_notifications(&report).await;
        assert_eq!(improved_reported, 1);
        let stored = h.store.latest_by_ticker("GTC0427").await.unwrap().unwrap();
        assert!(stored.notified);
    }

    #[tokio::test]
    async fn undelivered_bond_is_still_marked_notified() {
        let listings = FakeListingSource::new(&[("AAA0130", dec!(100))]);
        let notifier = RecordingNotifier {
            undeliverable: ["AAA0130".to_string()].into_iter().collect(),
            ..RecordingNotifier::default()
        };
        let h = harness(FakeEnrichmentClient::new(), listings, notifier);

        let summary = h.watcher.run_cycle(ts("2024-03-04T09:00:00Z")).await.unwrap();
        assert_eq!(summary.new_reported, 0);
        let stored = h.store.latest_by_ticker("AAA0130").await.unwrap().unwrap();
        assert!(stored.notified);
    }

    #[tokio::test]
    async fn listing_failure_alerts_and_propagates() {
        let mut listings = FakeListingSource::new(&[]);
        listings.fail = true;
        let h = harness(FakeEnrichmentClient::new(), listings, RecordingNotifier::default());

        let err = h.watcher.run_cycle(ts("2024-03-04T09:00:00Z")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Listing(_)));
        assert_eq!(*h.notifier.alerts.lock().unwrap(), vec![FETCH_FAILED_ALERT.to_string()]);
    }

    #[tokio::test]
    async fn duplicate_in_snapshot_aborts_reporting() {
        let listings = FakeListingSource::new(&[("AAA0130", dec!(100))]);
        let h = harness(FakeEnrichmentClient::new(), listings, RecordingNotifier::default());
        let dup = Bond {
            fetch_timestamp: ts("2024-03-04T09:00:00Z"),
            ..enriched_bond("AAA0130", dec!(101), dec!(4.4), chrono::NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
        };
        h.store.insert_raw(dup).await;

        let err = h.watcher.run_cycle(ts("2024-03-04T09:00:00Z")).await.unwrap_err();
        assert!(matches!(err, PipelineError::InconsistentSnapshot { .. }));
        assert_eq!(*h.notifier.alerts.lock().unwrap(), vec![DIFF_FAILED_ALERT.to_string()]);
        assert!(h.notifier.new_bonds.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_store_has_nothing_to_report() {
        let h = harness(FakeEnrichmentClient::new(), FakeListingSource::new(&[]), RecordingNotifier::default());
        let report = h.watcher.find_interesting_bonds(ts("2024-03-04T09:00:00Z").date_naive()).await.unwrap();
        assert!(report.is_empty());
    }
}
