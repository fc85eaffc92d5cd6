use async_trait::async_trait;
use chrono::NaiveDate;
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::bond::{BondDetails, YieldQuote};
use crate::config::Config;
use crate::constants::{BROKER_FEE, TAX_FEE};
use crate::error::{PipelineError, Result};

/// Remote lookups needed to enrich one bond. Implementations do not retry.
#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    async fn fetch_details(&self, ticker: &str) -> Result<BondDetails>;

    async fn compute_yield(&self, ticker: &str, price: Decimal, bond_type: &str) -> Result<YieldQuote>;
}

struct NotoriaRateLimiter {
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl reqwest_ratelimit::RateLimiter for NotoriaRateLimiter {
    async fn acquire_permit(&self) {
        self.rate_limiter.until_ready().await;
    }
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    bonds: ProfileBond,
}

#[derive(Debug, Deserialize)]
struct ProfileBond {
    issuer: String,
    info: ProfileInfo,
}

#[derive(Debug, Deserialize)]
struct ProfileInfo {
    maturity_date: String,
    code: String,
}

/// Client for the Notoria bond profile and yield calculator widgets
#[derive(Debug, Clone)]
pub struct NotoriaClient {
    http_client: ClientWithMiddleware,
    base_url: String,
}

impl NotoriaClient {
    pub fn new(base_url: &str, request_timeout: Duration, requests_per_second: NonZeroU32) -> Result<Self> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .default_headers(gpw_headers())
            .build()
            .map_err(|e| PipelineError::config(format!("failed to build pricing HTTP client: {e}")))?;

        let rate_limiter = NotoriaRateLimiter {
            rate_limiter: Arc::new(DefaultDirectRateLimiter::direct(Quota::per_second(requests_per_second))),
        };

        let http_client = ClientBuilder::new(reqwest_client)
            .with(reqwest_ratelimit::all(rate_limiter))
            .build();

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let requests_per_second = NonZeroU32::new(config.pricing_requests_per_second)
            .ok_or_else(|| PipelineError::config("pricing rate limit must be positive"))?;
        Self::new(&config.pricing_base_url, config.request_timeout, requests_per_second)
    }

    fn endpoint(&self, ticker: &str, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        Url::parse_with_params(&format!("{}/{}", self.base_url, path), params)
            .map_err(|e| PipelineError::remote(ticker, e))
    }

    async fn get_json(&self, ticker: &str, url: Url) -> Result<Value> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::remote(ticker, e))?
            .error_for_status()
            .map_err(|e| PipelineError::remote(ticker, e))?;
        response.json().await.map_err(|e| PipelineError::remote(ticker, e))
    }
}

#[async_trait]
impl EnrichmentClient for NotoriaClient {
    #[instrument(skip(self))]
    async fn fetch_details(&self, ticker: &str) -> Result<BondDetails> {
        let url = self.endpoint(ticker, "profile.php", &[("id", ticker)])?;
        let body = self.get_json(ticker, url).await?;
        let profile: ProfileResponse =
            serde_json::from_value(body).map_err(|e| PipelineError::remote(ticker, e))?;

        let maturity_date = NaiveDate::parse_from_str(&profile.bonds.info.maturity_date, "%Y-%m-%d")
            .map_err(|e| PipelineError::remote(ticker, format!("bad maturity date: {e}")))?;

        Ok(BondDetails {
            issuer: profile.bonds.issuer,
            maturity_date,
            bond_type: profile.bonds.info.code,
        })
    }

    #[instrument(skip(self, price), fields(price = %price))]
    async fn compute_yield(&self, ticker: &str, price: Decimal, bond_type: &str) -> Result<YieldQuote> {
        let price = price.to_string();
        let url = self.endpoint(
            ticker,
            "calculator.php",
            &[
                ("id", ticker),
                ("price", price.as_str()),
                ("type", bond_type),
                ("b_fee", BROKER_FEE),
                ("t_fee", TAX_FEE),
            ],
        )?;
        let body = self.get_json(ticker, url).await?;

        let Some(calculator) = body.get("calculator") else {
            debug!("Calculator returned no yield");
            return Ok(YieldQuote::NotAvailable);
        };
        let ytm_net = calculator
            .get("ytm_net")
            .ok_or_else(|| PipelineError::remote(ticker, "calculator response without ytm_net"))?;

        Ok(YieldQuote::Available(decimal_from_json(ytm_net).ok_or_else(|| {
            PipelineError::remote(ticker, format!("unparseable ytm_net: {ytm_net}"))
        })?))
    }
}

/// Reads a JSON number or string as an exact decimal, never going through f64
pub(crate) fn decimal_from_json(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn gpw_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("pl,en-US;q=0.9,en-GB;q=0.8,en;q=0.7"));
    headers.insert(REFERER, HeaderValue::from_static("https://gpwcatalyst.pl/"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://gpwcatalyst.pl"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"),
    );
    headers
}
