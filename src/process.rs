use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::ScrapeConfig;
use crate::fetch::{FetchCoordinator, FetchFailure};
use crate::request::{HttpFeed, PageSource};
use crate::store::{forward, JsonlStore, RecordStore};
use crate::window::build_window;
use crate::{info_time, Error, Result};

/// Acknowledgment handed back to the caller: where the next scrape starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pingback {
    #[serde(rename = "endingtime")]
    pub ending_time: i64,
}

/// Outcome of one scrape.
#[derive(Debug)]
pub struct ScrapeReport {
    pub next_cursor: i64,
    pub pages: usize,
    pub records_written: usize,
    /// URLs that produced no page. The caller may retry them with a fresh fetch.
    pub failures: Vec<FetchFailure>,
}

impl ScrapeReport {
    pub fn pingback(&self) -> Pingback {
        Pingback {
            ending_time: self.next_cursor,
        }
    }
}

/// Parses a starting cursor given by the caller.
pub fn parse_cursor(input: &str) -> Result<i64> {
    input.trim().parse::<i64>().map_err(|e| Error::InvalidInput {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Runs scrapes: window, concurrent fetch, store.
pub struct Scraper {
    config: ScrapeConfig,
    coordinator: FetchCoordinator,
    store: Arc<dyn RecordStore>,
}

impl Scraper {
    pub fn new(config: ScrapeConfig, source: Arc<dyn PageSource>, store: Arc<dyn RecordStore>) -> Self {
        let coordinator = FetchCoordinator::new(source)
            .with_heartbeat(config.heartbeat)
            .with_max_in_flight(config.max_in_flight);
        Self {
            config,
            coordinator,
            store,
        }
    }

    /// Scraper over the HTTP feed, writing JSON lines into the configured output directory.
    pub fn from_config(config: ScrapeConfig) -> Result<Self> {
        let source = Arc::new(HttpFeed::new(config.request_timeout)?);
        let store = Arc::new(JsonlStore::new(config.output_dir.clone()));
        Ok(Self::new(config, source, store))
    }

    /// Scrapes starting at the cursor given as text. A malformed cursor fails before any fetch.
    pub async fn run(&self, from: &str) -> Result<ScrapeReport> {
        let starting_time = parse_cursor(from)?;
        self.run_from(starting_time).await
    }

    pub async fn run_from(&self, starting_time: i64) -> Result<ScrapeReport> {
        let start_time = Local::now();
        let window = build_window(
            &self.config.feed_url,
            starting_time,
            self.config.interval,
            self.config.batch_size,
        )?;
        info!(
            from = starting_time,
            to = window.next_cursor,
            pages = window.urls.len(),
            "Started scraping"
        );

        let batch = self.coordinator.fetch_all(&window.urls).await?;

        let ack = forward(self.store.as_ref(), &batch).await.map_err(|e| match e {
            Error::StorageWrite { written, source, .. } => {
                error!(
                    written,
                    next_cursor = window.next_cursor,
                    "Batch only partially stored"
                );
                Error::StorageWrite {
                    written,
                    next_cursor: Some(window.next_cursor),
                    source,
                }
            }
            other => other,
        })?;

        info_time!(
            start_time,
            "Scrape done, resume from {}",
            window.next_cursor
        );
        Ok(ScrapeReport {
            next_cursor: window.next_cursor,
            pages: batch.pages.len(),
            records_written: ack.written,
            failures: batch.failures,
        })
    }

    /// Runs `rounds` scrapes back to back, each resuming from the previous cursor.
    /// Returns the reports in order; stops at the first error.
    pub async fn run_rounds(&self, from: &str, rounds: u32) -> Result<Vec<ScrapeReport>> {
        let mut cursor = parse_cursor(from)?;
        let mut reports = Vec::with_capacity(rounds as usize);
        for _ in 0..rounds {
            let report = self.run_from(cursor).await?;
            cursor = report.next_cursor;
            reports.push(report);
        }
        Ok(reports)
    }
}
