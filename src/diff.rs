//! Snapshot comparison: which bonds are new, which got a better net yield,
//! and which of those are worth reporting.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::{debug, instrument};

use crate::bonds::{Bond, ImprovedBond};
use crate::error::{PipelineError, Result};

/// Reporting policy applied to both new and improved bonds
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub min_yield_pct: Decimal, // inclusive
    pub max_yield_pct: Decimal, // inclusive
    pub min_horizon_days: u32,
}

impl FilterCriteria {
    pub fn new(min_yield_pct: Decimal, max_yield_pct: Decimal, min_horizon_days: u32) -> Result<Self> {
        if min_yield_pct.is_sign_negative() || max_yield_pct.is_sign_negative() {
            return Err(PipelineError::config("yield bounds must not be negative"));
        }
        if min_yield_pct > max_yield_pct {
            return Err(PipelineError::config(format!(
                "min yield {min_yield_pct}% exceeds max yield {max_yield_pct}%"
            )));
        }
        Ok(Self {
            min_yield_pct,
            max_yield_pct,
            min_horizon_days,
        })
    }

    /// Unreported, yield inside the range, bought back no later than `today + min_horizon_days`
    pub fn accepts(&self, bond: &Bond, today: NaiveDate) -> bool {
        let (Some(net_yield), Some(maturity)) = (bond.net_yield, bond.maturity_date) else {
            return false;
        };
        let Some(horizon) = today.checked_add_days(Days::new(self.min_horizon_days.into())) else {
            return false;
        };
        !bond.notified
            && maturity <= horizon
            && self.min_yield_pct <= net_yield
            && net_yield <= self.max_yield_pct
    }
}

/// Bonds to report after comparing two snapshots, ticker ascending
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DiffReport {
    pub new_bonds: Vec<Bond>,
    pub improved_bonds: Vec<ImprovedBond>,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.new_bonds.is_empty() && self.improved_bonds.is_empty()
    }
}

/// Keys a snapshot by ticker. A repeated ticker means the snapshot is corrupt.
pub fn index_snapshot(records: Vec<Bond>) -> Result<BTreeMap<String, Bond>> {
    let mut indexed = BTreeMap::new();
    for bond in records {
        match indexed.entry(bond.ticker.clone()) {
            Entry::Occupied(_) => {
                return Err(PipelineError::InconsistentSnapshot {
                    ticker: bond.ticker,
                    fetch_timestamp: bond.fetch_timestamp,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(bond);
            }
        }
    }
    Ok(indexed)
}

/// Tickers missing from `previous`, in ticker order
pub fn new_bonds(latest: &BTreeMap<String, Bond>, previous: &BTreeMap<String, Bond>) -> Vec<Bond> {
    latest
        .values()
        .filter(|bond| !previous.contains_key(&bond.ticker))
        .cloned()
        .collect()
}

/// Tickers whose net yield strictly increased, annotated with the previous quote
pub fn improved_bonds(latest: &BTreeMap<String, Bond>, previous: &BTreeMap<String, Bond>) -> Vec<ImprovedBond> {
    latest
        .values()
        .filter_map(|bond| {
            let prev = previous.get(&bond.ticker)?;
            let (current, prev_net_yield) = (bond.net_yield?, prev.net_yield?);
            (current > prev_net_yield).then(|| ImprovedBond {
                bond: bond.clone(),
                prev_net_yield,
                prev_price: prev.price,
            })
        })
        .collect()
}

/// Classifies `latest` against `previous` and keeps what the criteria accept
#[instrument(skip_all, fields(latest = latest.len(), previous = previous.len()))]
pub fn diff_snapshots(
    latest: Vec<Bond>,
    previous: Vec<Bond>,
    criteria: &FilterCriteria,
    today: NaiveDate,
) -> Result<DiffReport> {
    let latest = index_snapshot(latest)?;
    let previous = index_snapshot(previous)?;

    let new = new_bonds(&latest, &previous);
    let improved = improved_bonds(&latest, &previous);
    debug!(new = new.len(), improved = improved.len(), "Classified snapshot changes");

    Ok(DiffReport {
        new_bonds: new.into_iter().filter(|b| criteria.accepts(b, today)).collect(),
        improved_bonds: improved
            .into_iter()
            .filter(|i| criteria.accepts(&i.bond, today))
            .collect(),
    })
}
