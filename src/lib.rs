//! TRANSACTION FEED SCRAPER
//! Builds a window of time-sliced feed URLs, fetches every page concurrently,
//! and forwards the collected records to a store. Returns the cursor to resume from.

mod macros;
pub mod config;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod process;
pub mod request;
pub mod store;
pub mod window;

pub use error::{Error, FetchError, Result, StoreError};

/// Public transaction feed. Pages are selected with the `until` query parameter.
pub const FEED_URL: &str = "https://venmo.com/api/v5/public";
pub const DEFAULT_INTERVAL: i64 = 5;
pub const DEFAULT_BATCH_SIZE: i64 = 10;
/// How long the coordinator waits on the result channel before logging a heartbeat.
pub const HEARTBEAT_MS: u64 = 50;
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const TRANSACTION_COLLECTION: &str = "Transaction";
pub const TRANSACTION_GROUP: &str = "default_transaction";
