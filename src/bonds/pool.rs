use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, instrument};

use super::bond::Bond;
use super::enrichment::EnrichmentClient;
use super::retry::{RetryPolicy, enrich_with_retry};
use crate::constants::QUEUE_SLACK;
use crate::db::SnapshotStore;
use crate::error::{PipelineError, Result};

enum WorkItem {
    Bond(Bond),
    /// End-of-work marker, one per worker
    Shutdown,
}

type SharedQueue = Arc<Mutex<mpsc::Receiver<WorkItem>>>;

/// Result of one enrichment run
#[derive(Debug, Default)]
pub struct EnrichedBatch {
    pub bonds: Vec<Bond>,  // succeeded = true
    pub failed: Vec<Bond>, // Dropped after exhausting retries
}

/// Fixed set of workers enriching raw listings with bounded parallelism
pub struct WorkerPool {
    client: Arc<dyn EnrichmentClient>,
    store: Arc<dyn SnapshotStore>,
    workers: usize,
    retry_policy: RetryPolicy,
}

impl WorkerPool {
    pub fn new(
        client: Arc<dyn EnrichmentClient>,
        store: Arc<dyn SnapshotStore>,
        workers: usize,
        retry_policy: RetryPolicy,
    ) -> Result<Self> {
        if workers == 0 {
            return Err(PipelineError::config("worker pool needs at least one worker"));
        }
        Ok(Self {
            client,
            store,
            workers,
            retry_policy,
        })
    }

    /// Enriches every raw bond exactly once; returns once all workers have exited
    #[instrument(skip(self, raw), fields(bond_count = raw.len(), workers = self.workers, on_close = true))]
    pub async fn enrich(&self, raw: Vec<Bond>) -> Result<EnrichedBatch> {
        let (tx, rx) = mpsc::channel::<WorkItem>(raw.len() + self.workers + QUEUE_SLACK);
        let queue: SharedQueue = Arc::new(Mutex::new(rx));

        let handles: Vec<_> = (0..self.workers)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&queue),
                    Arc::clone(&self.client),
                    Arc::clone(&self.store),
                    self.retry_policy,
                ))
            })
            .collect();

        for bond in raw {
            tx.send(WorkItem::Bond(bond))
                .await
                .map_err(|_| PipelineError::Worker("all workers exited before the queue was drained".to_string()))?;
        }
        for _ in 0..self.workers {
            tx.send(WorkItem::Shutdown)
                .await
                .map_err(|_| PipelineError::Worker("all workers exited before shutdown".to_string()))?;
        }
        drop(tx);

        let mut batch = EnrichedBatch::default();
        for joined in join_all(handles).await {
            let processed = joined.map_err(|e| {
                error!(error = %e, "Enrichment worker panicked");
                PipelineError::Worker(e.to_string())
            })?;
            for bond in processed {
                if bond.succeeded {
                    batch.bonds.push(bond);
                } else {
                    batch.failed.push(bond);
                }
            }
        }

        info!(
            enriched = batch.bonds.len(),
            failed = batch.failed.len(),
            failed_tickers = ?batch.failed.iter().map(|b| b.ticker.as_str()).collect::<Vec<_>>(),
            "Enrichment run completed"
        );
        Ok(batch)
    }
}

/// Pulls one bond at a time until its shutdown marker arrives
async fn run_worker(
    worker_id: usize,
    queue: SharedQueue,
    client: Arc<dyn EnrichmentClient>,
    store: Arc<dyn SnapshotStore>,
    retry_policy: RetryPolicy,
) -> Vec<Bond> {
    let mut processed = Vec::new();
    loop {
        let item = queue.lock().await.recv().await;
        let mut bond = match item {
            Some(WorkItem::Bond(bond)) => bond,
            Some(WorkItem::Shutdown) | None => break,
        };

        match store.latest_by_ticker(&bond.ticker).await {
            Ok(prior) => {
                enrich_with_retry(&mut bond, prior.as_ref(), client.as_ref(), &retry_policy).await;
            }
            Err(e) => {
                error!(ticker = %bond.ticker, error = %e, "Failed to look up prior record, dropping bond");
                bond.succeeded = false;
            }
        }
        processed.push(bond);
    }
    debug!(worker_id = worker_id, processed = processed.len(), "Worker shut down");
    processed
}
