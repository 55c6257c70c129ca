use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::parse::{decode_page, Page};
use crate::{FetchError, Result};

/// Anything that can turn a feed URL into a decoded [`Page`].
#[async_trait]
pub trait PageSource: Send + Sync + 'static {
    async fn fetch_page(&self, url: &str) -> core::result::Result<Page, FetchError>;
}

/// Feed source over HTTP. Every request is bounded by the client's timeout,
/// so a stalled connection still produces an outcome.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: Client,
}

impl HttpFeed {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpFeed {
    async fn fetch_page(&self, url: &str) -> core::result::Result<Page, FetchError> {
        let res = self.client.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = res.bytes().await?;
        Ok(decode_page(&body)?)
    }
}

/// What a fetch task reports back to the coordinator. `index` is the URL's
/// position in the dispatched list.
#[derive(Debug)]
pub(crate) struct FetchOutcome {
    pub index: usize,
    pub url: String,
    pub result: core::result::Result<Page, FetchError>,
}

/// Fetches and decodes a single page, then sends exactly one outcome through the channel,
/// whether the fetch succeeded or not.
pub(crate) async fn request_page<S>(
    source: &S,
    index: usize,
    url: String,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
) where
    S: PageSource + ?Sized,
{
    debug!("Fetching {}", url);
    let result = source.fetch_page(&url).await;
    if outcome_tx.send(FetchOutcome { index, url, result }).is_err() {
        warn!(index, "Coordinator stopped listening, dropping fetch outcome");
    }
}
