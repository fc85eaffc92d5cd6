use std::time::Duration;
use tracing::{debug, error, warn};

use super::bond::Bond;
use super::enrichment::EnrichmentClient;
use crate::constants::{DEFAULT_BACKOFF_SECS, DEFAULT_MAX_RETRIES};
use crate::error::Result;

/// Fixed-backoff retry budget for one bond
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32, // Attempts after the first one
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
        }
    }
}

/// Enriches `bond` in place, reusing `prior` (latest stored record of the same ticker)
/// wherever it is still valid. Faults are retried up to the policy budget; the
/// outcome is recorded in `bond.succeeded` and returned.
pub async fn enrich_with_retry(
    bond: &mut Bond,
    prior: Option<&Bond>,
    client: &dyn EnrichmentClient,
    policy: &RetryPolicy,
) -> bool {
    let mut retries_left = policy.max_retries;
    let mut attempt: u32 = 1;

    loop {
        match enrich_once(bond, prior, client).await {
            Ok(()) => {
                bond.succeeded = true;
                return true;
            }
            Err(e) if retries_left == 0 => {
                error!(
                    ticker = %bond.ticker,
                    attempts = attempt,
                    error = %e,
                    "Giving up on bond after exhausting retries"
                );
                bond.succeeded = false;
                return false;
            }
            Err(e) => {
                warn!(
                    ticker = %bond.ticker,
                    attempt = attempt,
                    retries_left = retries_left,
                    error = %e,
                    "Enrichment failed, retrying after backoff"
                );
                tokio::time::sleep(policy.backoff).await;
                retries_left -= 1;
                attempt += 1;
            }
        }
    }
}

async fn enrich_once(bond: &mut Bond, prior: Option<&Bond>, client: &dyn EnrichmentClient) -> Result<()> {
    match prior {
        Some(prior) if prior.has_details() => bond.copy_details_from(prior),
        // Details survive a failed yield call, so a retry only repeats what failed
        _ if bond.has_details() => {}
        _ => {
            let details = client.fetch_details(&bond.ticker).await?;
            bond.apply_details(details);
            debug!(ticker = %bond.ticker, "Fetched details");
        }
    }

    match prior {
        Some(prior) if prior.price == bond.price && prior.net_yield.is_some() => {
            bond.net_yield = prior.net_yield;
        }
        _ if bond.net_yield.is_some() => {}
        _ => {
            let bond_type = bond.bond_type.as_deref().unwrap_or_default();
            let quote = client.compute_yield(&bond.ticker, bond.price, bond_type).await?;
            bond.net_yield = Some(quote.net_yield());
            debug!(ticker = %bond.ticker, ?quote, "Calculated yield");
        }
    }
    Ok(())
}
