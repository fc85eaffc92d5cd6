use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::bonds::retry::RetryPolicy;
use crate::constants::*;
use crate::diff::FilterCriteria;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub listing_url: String,
    pub pricing_base_url: String,
    pub worker_count: usize,
    pub retry_policy: RetryPolicy,
    pub request_timeout: Duration,
    pub pricing_requests_per_second: u32,
    pub criteria: FilterCriteria,
    pub fetch_delay_min: Duration,
    pub fetch_delay_max: Duration,
    pub check_trading_hours: bool,
    pub publish: bool,
    pub discord_webhook_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, validating every value up front
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| PipelineError::config("missing DATABASE_URL"))?;

        let worker_count = parse_or(&lookup, "WORKER_COUNT", DEFAULT_WORKER_COUNT)?;
        if worker_count == 0 {
            return Err(PipelineError::config("WORKER_COUNT must be at least 1"));
        }

        let retry_policy = RetryPolicy {
            max_retries: parse_or(&lookup, "ENRICH_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            backoff: Duration::from_secs(parse_or(&lookup, "ENRICH_BACKOFF_SECS", DEFAULT_BACKOFF_SECS)?),
        };

        let pricing_requests_per_second = parse_or(
            &lookup,
            "PRICING_REQUESTS_PER_SECOND",
            DEFAULT_PRICING_REQUESTS_PER_SECOND,
        )?;
        if pricing_requests_per_second == 0 {
            return Err(PipelineError::config("PRICING_REQUESTS_PER_SECOND must be at least 1"));
        }

        let criteria = FilterCriteria::new(
            parse_or(&lookup, "MIN_YIELD_PCT", Decimal::from(DEFAULT_MIN_YIELD_PCT))?,
            parse_or(&lookup, "MAX_YIELD_PCT", Decimal::from(DEFAULT_MAX_YIELD_PCT))?,
            parse_or(&lookup, "MIN_HORIZON_DAYS", DEFAULT_MIN_HORIZON_DAYS)?,
        )?;

        let fetch_delay_min = parse_or(&lookup, "FETCH_DELAY_MIN_SECS", DEFAULT_FETCH_DELAY_MIN_SECS)?;
        let fetch_delay_max = parse_or(&lookup, "FETCH_DELAY_MAX_SECS", DEFAULT_FETCH_DELAY_MAX_SECS)?;
        if fetch_delay_min > fetch_delay_max {
            return Err(PipelineError::config(
                "FETCH_DELAY_MIN_SECS must not exceed FETCH_DELAY_MAX_SECS",
            ));
        }

        let publish = parse_or(&lookup, "PUBLISH", true)?;
        let discord_webhook_url = lookup("DISCORD_WEBHOOK_URL").filter(|url| !url.is_empty());
        if publish && discord_webhook_url.is_none() {
            return Err(PipelineError::config(
                "DISCORD_WEBHOOK_URL is required when PUBLISH=true",
            ));
        }

        Ok(Config {
            database_url,
            listing_url: lookup("LISTING_URL").unwrap_or_else(|| BOSSA_LISTING_URL.to_string()),
            pricing_base_url: lookup("PRICING_BASE_URL").unwrap_or_else(|| NOTORIA_BASE_URL.to_string()),
            worker_count,
            retry_policy,
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            pricing_requests_per_second,
            criteria,
            fetch_delay_min: Duration::from_secs(fetch_delay_min),
            fetch_delay_max: Duration::from_secs(fetch_delay_max),
            check_trading_hours: parse_or(&lookup, "CHECK_TRADING_HOURS", true)?,
            publish,
            discord_webhook_url,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| PipelineError::config(format!("invalid {key}={raw}: {e}"))),
        None => Ok(default),
    }
}
