//! Page fetching over HTTP.
//!
//! [`PageFetcher`] is the seam between the crawl pipeline and the network:
//! jobs only ever see "URL in, raw HTML out, or a fetch error". The production
//! implementation is a thin reqwest wrapper with a fixed request timeout and
//! browser-like headers; tests substitute their own implementations to feed
//! canned pages or simulate failures.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::CrawlError;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";
const REFERRER: &str = "http://www.google.com";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Retrieves raw page content for a URL. Replaceable for tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page body at `url`.
    ///
    /// # Errors
    ///
    /// [`CrawlError::Fetch`] on connection failure, timeout, or a non-success
    /// HTTP status.
    async fn fetch(&self, url: &str) -> Result<String, CrawlError>;
}

/// reqwest-backed [`PageFetcher`] with a shared connection pool.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .expect("static reqwest client configuration");
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
        let fetch_error = |reason: String| {
            warn!(%url, %reason, "Cannot access this page");
            CrawlError::Fetch {
                url: url.to_string(),
                reason,
            }
        };

        let response = self
            .client
            .get(url)
            .header(reqwest::header::REFERER, REFERRER)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| fetch_error(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        debug!(%url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}
