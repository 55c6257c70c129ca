//! Concurrent fan-out fetch and fan-in aggregation.
//!
//! One task is spawned per URL. Every task reports exactly one outcome through a
//! shared `mpsc` channel and the coordinator counts outcomes until it has one per URL.
//! While waiting it wakes up every heartbeat interval and logs progress; it never
//! cancels a task, each request is bounded by its own timeout instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::parse::{Page, Record};
use crate::request::{request_page, FetchOutcome, PageSource};
use crate::{info_time, Error, FetchError, Result, HEARTBEAT_MS};

const MIN_HEARTBEAT: Duration = Duration::from_millis(1);

/// A URL that did not produce a page, with the reason.
#[derive(Debug)]
pub struct FetchFailure {
    pub url: String,
    pub error: FetchError,
}

/// Pages collected in one fetch round, in arrival order, plus the URLs that failed.
#[derive(Debug, Default)]
pub struct Batch {
    pub pages: Vec<Page>,
    pub failures: Vec<FetchFailure>,
    /// Heartbeat ticks logged while waiting on outcomes.
    pub heartbeats: usize,
}

impl Batch {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            pages: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Number of resolved URLs, successful or not.
    pub fn resolved(&self) -> usize {
        self.pages.len() + self.failures.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.pages.iter().flat_map(|page| page.data.iter())
    }

    pub fn record_count(&self) -> usize {
        self.pages.iter().map(|page| page.data.len()).sum()
    }
}

/// Fans a list of URLs out over a [`PageSource`] and collects the results.
#[derive(Clone)]
pub struct FetchCoordinator {
    source: Arc<dyn PageSource>,
    heartbeat: Duration,
    max_in_flight: Option<usize>,
}

impl FetchCoordinator {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            source,
            heartbeat: Duration::from_millis(HEARTBEAT_MS),
            max_in_flight: None,
        }
    }

    /// How long to wait on the result channel before logging a heartbeat. At least 1 ms.
    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat.max(MIN_HEARTBEAT);
        self
    }

    /// Caps the number of requests in flight at once. `None` fetches every URL at once.
    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight.map(|n| n.max(1));
        self
    }

    /// Fetches every URL concurrently and returns once each one has resolved.
    ///
    /// Failed URLs are listed in [`Batch::failures`]; the call only fails with
    /// [`Error::FetchAggregate`] when no URL produced a page.
    pub async fn fetch_all(&self, urls: &[String]) -> Result<Batch> {
        let expected = urls.len();
        if expected == 0 {
            return Ok(Batch::default());
        }
        let start_time = Local::now();

        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let tasks = self.dispatch(urls, outcome_tx);

        let mut batch = Batch::with_capacity(expected);
        let mut reported = vec![false; expected];
        while batch.resolved() < expected {
            match timeout(self.heartbeat, outcome_rx.recv()).await {
                Ok(Some(outcome)) => {
                    reported[outcome.index] = true;
                    collect_outcome(&mut batch, outcome);
                }
                // Every task is gone, the missing ones died without reporting.
                Ok(None) => break,
                Err(_) => {
                    batch.heartbeats += 1;
                    trace!(received = batch.resolved(), expected, "Waiting on fetches");
                }
            }
        }

        reap_tasks(tasks).await;
        for (index, _) in reported.iter().enumerate().filter(|(_, done)| !**done) {
            let url = urls[index].clone();
            warn!(url = %url, "Fetch task ended without reporting an outcome");
            batch.failures.push(FetchFailure {
                url,
                error: FetchError::Aborted("task panicked or was cancelled".into()),
            });
        }

        info_time!(
            start_time,
            "Fetched {} of {} pages, {} failed",
            batch.pages.len(),
            expected,
            batch.failures.len()
        );

        if batch.pages.is_empty() {
            return Err(Error::FetchAggregate(batch.failures));
        }
        Ok(batch)
    }

    /// Spawns one fetch task per URL. Each task owns a sender clone, the caller's is consumed.
    fn dispatch(&self, urls: &[String], outcome_tx: mpsc::UnboundedSender<FetchOutcome>) -> JoinSet<()> {
        let limiter = self.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));
        let mut task_set = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            task_set.spawn({
                let source = Arc::clone(&self.source);
                let outcome_tx = outcome_tx.clone();
                let limiter = limiter.clone();
                let url = url.clone();

                async move {
                    // The semaphore is never closed, so acquiring only waits.
                    let _permit = match limiter {
                        Some(limiter) => limiter.acquire_owned().await.ok(),
                        None => None,
                    };
                    request_page(source.as_ref(), index, url, outcome_tx).await
                }
            });
        }
        task_set
    }
}

fn collect_outcome(batch: &mut Batch, outcome: FetchOutcome) {
    match outcome.result {
        Ok(page) => {
            debug!(
                url = %outcome.url,
                next = page.paging.next.as_deref().unwrap_or("-"),
                records = page.data.len(),
                "Page was fetched"
            );
            batch.pages.push(page);
        }
        Err(error) => {
            warn!(url = %outcome.url, error = %error, "Fetch failed");
            batch.failures.push(FetchFailure {
                url: outcome.url,
                error,
            });
        }
    }
}

/// Waits for finished tasks so panics get logged.
async fn reap_tasks(mut tasks: JoinSet<()>) {
    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res {
            warn!(error = %e, "Fetch task failed to complete");
        }
    }
}
