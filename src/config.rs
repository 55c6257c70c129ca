use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::{
    Error, Result, DEFAULT_BATCH_SIZE, DEFAULT_INTERVAL, FEED_URL, HEARTBEAT_MS,
    REQUEST_TIMEOUT_SECS,
};

/// Settings for a scrape run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
    pub feed_url: Url,
    /// Cursor step between two consecutive pages.
    pub interval: i64,
    /// Pages fetched per scrape.
    pub batch_size: i64,
    pub request_timeout: Duration,
    pub heartbeat: Duration,
    pub max_in_flight: Option<usize>,
    /// Directory the file store writes to.
    pub output_dir: PathBuf,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            feed_url: Url::parse(FEED_URL).expect("FEED_URL is a valid URL"),
            interval: DEFAULT_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            heartbeat: Duration::from_millis(HEARTBEAT_MS),
            max_in_flight: None,
            output_dir: PathBuf::from("data"),
        }
    }
}

/// Scrape a paginated public transaction feed and store every record.
#[derive(Debug, Clone, Parser)]
#[command(name = "txscrap", version, about)]
pub struct Cli {
    /// Starting cursor (epoch seconds) of the first page
    #[arg(long, env = "TXSCRAP_FROM")]
    pub from: String,

    /// Number of consecutive scrapes, each resuming from the previous cursor
    #[arg(long, env = "TXSCRAP_ROUNDS", default_value_t = 1)]
    pub rounds: u32,

    /// Feed endpoint, pages are selected with its `until` query parameter
    #[arg(long, env = "TXSCRAP_FEED_URL", default_value = FEED_URL)]
    pub feed_url: String,

    /// Cursor step between two consecutive pages
    #[arg(long, env = "TXSCRAP_INTERVAL", default_value_t = DEFAULT_INTERVAL, allow_negative_numbers = true)]
    pub interval: i64,

    /// Pages fetched per scrape
    #[arg(long, env = "TXSCRAP_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE, allow_negative_numbers = true)]
    pub batch_size: i64,

    /// Per-request timeout in seconds
    #[arg(long, env = "TXSCRAP_TIMEOUT_SECS", default_value_t = REQUEST_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Heartbeat interval in milliseconds while waiting on pages
    #[arg(long, env = "TXSCRAP_HEARTBEAT_MS", default_value_t = HEARTBEAT_MS)]
    pub heartbeat_ms: u64,

    /// Maximum number of requests in flight (unbounded if not set)
    #[arg(long, env = "TXSCRAP_MAX_IN_FLIGHT")]
    pub max_in_flight: Option<usize>,

    /// Directory the records are written to
    #[arg(long, env = "TXSCRAP_OUTPUT_DIR", default_value = "data")]
    pub output_dir: PathBuf,
}

impl Cli {
    pub fn scrape_config(&self) -> Result<ScrapeConfig> {
        let feed_url = Url::parse(&self.feed_url)
            .map_err(|e| Error::Config(format!("invalid feed URL {:?}: {e}", self.feed_url)))?;
        if self.timeout_secs == 0 {
            return Err(Error::Config("request timeout must be at least one second".into()));
        }
        Ok(ScrapeConfig {
            feed_url,
            interval: self.interval,
            batch_size: self.batch_size,
            request_timeout: Duration::from_secs(self.timeout_secs),
            heartbeat: Duration::from_millis(self.heartbeat_ms.max(1)),
            max_in_flight: self.max_in_flight,
            output_dir: self.output_dir.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_feed_constants() {
        let cli = Cli::try_parse_from(["txscrap", "--from", "1000"]).unwrap();
        let config = cli.scrape_config().unwrap();

        assert_eq!(cli.rounds, 1);
        assert_eq!(config, ScrapeConfig::default());
    }

    #[test]
    fn overrides_from_arguments() {
        let cli = Cli::try_parse_from([
            "txscrap",
            "--from",
            "1000",
            "--interval",
            "60",
            "--batch-size",
            "3",
            "--feed-url",
            "http://127.0.0.1:3000/public",
            "--max-in-flight",
            "2",
        ])
        .unwrap();
        let config = cli.scrape_config().unwrap();

        assert_eq!(config.interval, 60);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.feed_url.as_str(), "http://127.0.0.1:3000/public");
        assert_eq!(config.max_in_flight, Some(2));
    }

    #[test]
    fn cursor_is_kept_raw() {
        let cli = Cli::try_parse_from(["txscrap", "--from", "yesterday"]).unwrap();
        assert_eq!(cli.from, "yesterday");
    }

    #[test]
    fn rejects_bad_feed_url() {
        let cli = Cli::try_parse_from(["txscrap", "--from", "1", "--feed-url", "not a url"]).unwrap();
        assert!(matches!(cli.scrape_config(), Err(Error::Config(_))));
    }
}
