use reqwest::StatusCode;
use thiserror::Error;

use crate::fetch::FetchFailure;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid window: interval {interval}, count {count}. Interval must be positive and count non-negative.")]
    InvalidWindow { interval: i64, count: i64 },
    #[error("Invalid starting cursor {input:?}: {reason}")]
    InvalidInput { input: String, reason: String },
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Every fetch in the batch failed ({} URLs)", .0.len())]
    FetchAggregate(Vec<FetchFailure>),

    #[error("Storage write failed after {written} records: {source}")]
    StorageWrite {
        written: usize,
        /// Cursor of the scrape the batch belonged to, once known.
        next_cursor: Option<i64>,
        #[source]
        source: StoreError,
    },

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Outcome of a single fetch task that did not produce a page.
/// Recorded against its URL, never propagated on its own.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Feed responded with status {0}")]
    Status(StatusCode),
    #[error("Couldn't decode page: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Fetch task ended without reporting: {0}")]
    Aborted(String),
}

impl FetchError {
    /// Transport-level failures, including non-2xx responses.
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Status(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, FetchError::Decode(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            FetchError::Transport(format!("request timed out: {value}"))
        } else {
            FetchError::Transport(value.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Couldn't serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Store rejected the record: {0}")]
    Rejected(String),
}
