use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::bond::Bond;
use super::enrichment::decimal_from_json;
use crate::error::{PipelineError, Result};

/// Raw listings of one harvest, all stamped with the same fetch timestamp
#[derive(Debug, Clone)]
pub struct ListingBatch {
    pub bonds: Vec<Bond>,
    pub dropped: usize, // Malformed entries rejected by validation
}

/// Source of currently tradable bonds
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listings(&self, fetch_timestamp: DateTime<Utc>) -> Result<ListingBatch>;
}

/// Bossa quote feed for the Catalyst bond market
#[derive(Debug, Clone)]
pub struct BossaListingSource {
    http_client: Client,
    url: String,
}

impl BossaListingSource {
    pub fn new(url: &str, request_timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(REFERER, HeaderValue::from_static("https://bossa.pl/"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://bossa.pl"));

        let http_client = Client::builder()
            .timeout(request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| PipelineError::config(format!("failed to build listing HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl ListingSource for BossaListingSource {
    #[instrument(skip(self), fields(on_close = true))]
    async fn fetch_listings(&self, fetch_timestamp: DateTime<Utc>) -> Result<ListingBatch> {
        let body: Value = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| PipelineError::Listing(e.to_string()))?
            .json()
            .await
            .map_err(|e| PipelineError::Listing(e.to_string()))?;

        let batch = parse_listings(&body, fetch_timestamp)?;
        info!(
            listed = batch.bonds.len(),
            dropped = batch.dropped,
            "Fetched tradable bond listings"
        );
        Ok(batch)
    }
}

/// Keeps entries with an ask, drops and counts the ones that cannot be read
pub fn parse_listings(body: &Value, fetch_timestamp: DateTime<Utc>) -> Result<ListingBatch> {
    let entries = body["_d"][0]["_t"]
        .as_array()
        .ok_or_else(|| PipelineError::Listing("response has no _d[0]._t table".to_string()))?;

    let mut bonds = Vec::with_capacity(entries.len());
    let mut dropped = 0;
    for entry in entries {
        let ask = &entry["_ask_size"];
        if ask.is_null() {
            continue; // not tradable right now
        }

        let ticker = entry["_symbol"].as_str().map(str::trim).filter(|s| !s.is_empty());
        match (ticker, decimal_from_json(ask)) {
            (Some(ticker), Some(price)) => bonds.push(Bond::raw(ticker, price, fetch_timestamp)),
            _ => {
                dropped += 1;
                warn!(entry = %entry, "Dropping malformed listing entry");
            }
        }
    }
    debug!(accepted = bonds.len(), dropped = dropped, "Listing entries validated");

    Ok(ListingBatch { bonds, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed() -> Value {
        json!({
            "_d": [{
                "_t": [
                    { "_symbol": "PCR0526", "_ask_size": 101.2 },
                    { "_symbol": "GTC0427", "_ask_size": "99.95" },
                    { "_symbol": "KRU1126", "_ask_size": null },
                    { "_symbol": "BAD0101", "_ask_size": "n/a" },
                    { "_ask_size": 100 }
                ]
            }]
        })
    }

    #[test]
    fn parse_listings_filters_and_counts() {
        let ts = Utc::now();
        let batch = parse_listings(&feed(), ts).unwrap();

        let tickers: Vec<&str> = batch.bonds.iter().map(|b| b.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["PCR0526", "GTC0427"]);
        assert_eq!(batch.bonds[0].price, dec!(101.2));
        assert_eq!(batch.bonds[1].price, dec!(99.95));
        assert_eq!(batch.dropped, 2);
        assert!(batch.bonds.iter().all(|b| b.fetch_timestamp == ts && !b.notified));
    }

    #[test]
    fn parse_listings_rejects_unexpected_shape() {
        let err = parse_listings(&json!({ "status": "down" }), Utc::now()).unwrap_err();
        assert!(matches!(err, PipelineError::Listing(_)));
    }

    #[tokio::test]
    async fn fetch_listings_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_cat_bonds"))
            .respond_with(ResponseTemplate::new(200).set_body_json(feed()))
            .mount(&server)
            .await;

        let source = BossaListingSource::new(
            &format!("{}/_cat_bonds", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();
        let batch = source.fetch_listings(Utc::now()).await.unwrap();
        assert_eq!(batch.bonds.len(), 2);
    }
}
