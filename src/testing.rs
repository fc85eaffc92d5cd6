//! Fakes for the collaborator traits, shared by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal::dec;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::bonds::{Bond, BondDetails, EnrichmentClient, ImprovedBond, ListingBatch, ListingSource, RetryPolicy, YieldQuote};
use crate::error::{PipelineError, Result};
use crate::notify::Notifier;

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 5,
        backoff: Duration::ZERO,
    }
}

pub fn ts(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
}

pub fn enriched_bond(ticker: &str, price: Decimal, net_yield: Decimal, maturity: NaiveDate) -> Bond {
    Bond {
        ticker: ticker.to_string(),
        issuer: Some(format!("Issuer of {ticker}")),
        price,
        net_yield: Some(net_yield),
        maturity_date: Some(maturity),
        bond_type: Some("CB".to_string()),
        fetch_timestamp: ts("2024-01-01T09:00:00Z"),
        notified: false,
        succeeded: true,
    }
}

#[derive(Default)]
pub struct FakeEnrichmentClient {
    yields: HashMap<String, YieldQuote>,
    always_failing: HashSet<String>,
    details_failures: Mutex<HashMap<String, usize>>,
    yield_failures: Mutex<HashMap<String, usize>>,
    details_calls: AtomicUsize,
    yield_calls: AtomicUsize,
}

impl FakeEnrichmentClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_yield(mut self, ticker: &str, quote: YieldQuote) -> Self {
        self.yields.insert(ticker.to_string(), quote);
        self
    }

    pub fn always_failing(mut self, ticker: &str) -> Self {
        self.always_failing.insert(ticker.to_string());
        self
    }

    pub fn failing_first(self, ticker: &str, times: usize) -> Self {
        self.details_failures.lock().unwrap().insert(ticker.to_string(), times);
        self
    }

    pub fn failing_yield_first(self, ticker: &str, times: usize) -> Self {
        self.yield_failures.lock().unwrap().insert(ticker.to_string(), times);
        self
    }

    pub fn details_calls(&self) -> usize {
        self.details_calls.load(Ordering::SeqCst)
    }

    pub fn yield_calls(&self) -> usize {
        self.yield_calls.load(Ordering::SeqCst)
    }

    fn take_failure(failures: &Mutex<HashMap<String, usize>>, ticker: &str) -> bool {
        let mut failures = failures.lock().unwrap();
        match failures.get_mut(ticker) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl EnrichmentClient for FakeEnrichmentClient {
    async fn fetch_details(&self, ticker: &str) -> Result<BondDetails> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.always_failing.contains(ticker) || Self::take_failure(&self.details_failures, ticker) {
            return Err(PipelineError::remote(ticker, "connection reset"));
        }
        Ok(BondDetails {
            issuer: format!("Issuer of {ticker}"),
            maturity_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            bond_type: "CB".to_string(),
        })
    }

    async fn compute_yield(&self, ticker: &str, _price: Decimal, _bond_type: &str) -> Result<YieldQuote> {
        self.yield_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.always_failing.contains(ticker) || Self::take_failure(&self.yield_failures, ticker) {
            return Err(PipelineError::remote(ticker, "timeout"));
        }
        Ok(self
            .yields
            .get(ticker)
            .copied()
            .unwrap_or(YieldQuote::Available(dec!(5.0))))
    }
}

/// Serves a fixed list of `(ticker, price)` listings, or a fault
pub struct FakeListingSource {
    pub listings: Mutex<Vec<(String, Decimal)>>,
    pub fail: bool,
}

impl FakeListingSource {
    pub fn new(listings: &[(&str, Decimal)]) -> Self {
        Self {
            listings: Mutex::new(listings.iter().map(|(t, p)| (t.to_string(), *p)).collect()),
            fail: false,
        }
    }

    pub fn set(&self, listings: &[(&str, Decimal)]) {
        *self.listings.lock().unwrap() = listings.iter().map(|(t, p)| (t.to_string(), *p)).collect();
    }
}

#[async_trait]
impl ListingSource for FakeListingSource {
    async fn fetch_listings(&self, fetch_timestamp: DateTime<Utc>) -> Result<ListingBatch> {
        if self.fail {
            return Err(PipelineError::Listing("feed unavailable".to_string()));
        }
        let bonds = self
            .listings
            .lock()
            .unwrap()
            .iter()
            .map(|(ticker, price)| Bond::raw(ticker.clone(), *price, fetch_timestamp))
            .collect();
        Ok(ListingBatch { bonds, dropped: 0 })
    }
}

/// Records every delivery; tickers in `undeliverable` fail to send
#[derive(Default)]
pub struct RecordingNotifier {
    pub new_bonds: Mutex<Vec<String>>,
    pub improved_bonds: Mutex<Vec<(String, Decimal, Decimal)>>,
    pub alerts: Mutex<Vec<String>>,
    pub undeliverable: HashSet<String>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_new(&self, bond: &Bond) -> Result<()> {
        if self.undeliverable.contains(&bond.ticker) {
            return Err(PipelineError::Notification("channel unavailable".to_string()));
        }
        self.new_bonds.lock().unwrap().push(bond.ticker.clone());
        Ok(())
    }

    async fn notify_improved(&self, improved: &ImprovedBond) -> Result<()> {
        if self.undeliverable.contains(&improved.bond.ticker) {
            return Err(PipelineError::Notification("channel unavailable".to_string()));
        }
        self.improved_bonds.lock().unwrap().push((
            improved.bond.ticker.clone(),
            improved.prev_net_yield,
            improved.bond.net_yield.unwrap_or_default(),
        ));
        Ok(())
    }

    async fn alert(&self, message: &str) -> Result<()> {
        self.alerts.lock().unwrap().push(message.to_string());
        Ok(())
    }
}
