//! Error taxonomy shared by the enrichment pipeline, the diff engine and the
//! collaborators around them.
//!
//! Per-record faults (`Remote`) never leave the retry wrapper; they are turned
//! into a dropped record. Everything else propagates to the caller of a watch
//! cycle, which logs it and skips that cycle.

use chrono::{DateTime, Utc};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Network or malformed-response fault from the pricing service.
    #[error("remote error for {ticker}: {message}")]
    Remote { ticker: String, message: String },

    /// Two records with the same ticker inside one snapshot.
    #[error("found duplicate ticker {ticker} in snapshot {fetch_timestamp}")]
    InconsistentSnapshot {
        ticker: String,
        fetch_timestamp: DateTime<Utc>,
    },

    /// Invalid pool size, threshold or environment value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Listing source could not be read.
    #[error("listing source error: {0}")]
    Listing(String),

    /// A record is missing a field the store requires.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("notification error: {0}")]
    Notification(String),

    /// A worker task died before handing back its records.
    #[error("worker failure: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn remote(ticker: &str, message: impl std::fmt::Display) -> Self {
        Self::Remote {
            ticker: ticker.to_string(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
