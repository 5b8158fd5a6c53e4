//! Expiring page cache with per-URL access counts.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{Store, StoreError};

/// Seconds a fetched page stays cached.
pub const DEFAULT_PAGE_TTL: u64 = 10;

#[derive(Error, Debug, PartialEq)]
pub enum FetchError {
    #[error("failed to fetch {url}: {message}")]
    Request { url: String, message: String },
}

#[derive(Error, Debug, PartialEq)]
pub enum PageError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("page at {0} is not valid UTF-8")]
    InvalidUtf8(String),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl<T> Fetcher for Arc<T>
where
    T: Fetcher + ?Sized,
{
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch(url).await
    }
}

/// Fetches pages over HTTP.
///
/// The body is returned whatever the response status, like a browser
/// showing an error page.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let request_error = |e: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        let body = response.text().await.map_err(request_error)?;

        debug!(url, %status, bytes = body.len(), "fetched page");

        Ok(body)
    }
}

/// Key holding the number of times `url` was requested.
pub fn count_key(url: &str) -> String {
    format!("count:{}", url)
}

/// Page bodies are stored under the URL itself and expire after `ttl_seconds`.
pub struct PageCache<S, F> {
    store: S,
    fetcher: F,
    ttl_seconds: u64,
}

impl<S, F> PageCache<S, F>
where
    S: Store,
    F: Fetcher,
{
    pub fn new(store: S, fetcher: F) -> Self {
        Self {
            store,
            fetcher,
            ttl_seconds: DEFAULT_PAGE_TTL,
        }
    }

    /// Overrides the expiry. Values below one second are raised to one.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds.max(1);
        self
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Returns the body of `url`, from the cache when it holds a copy.
    ///
    /// Every call counts as an access, hit or miss. A failed fetch caches
    /// nothing.
    pub async fn get_page(&self, url: &str) -> Result<String, PageError> {
        let count = self.store.incr(&count_key(url)).await?;

        if let Some(cached) = self.store.get(url).await? {
            // an empty body is treated as a miss
            if !cached.is_empty() {
                debug!(url, count, "page cache hit");
                return String::from_utf8(cached.to_vec())
                    .map_err(|_| PageError::InvalidUtf8(url.to_string()));
            }
        }

        info!(url, count, "page cache miss, fetching");

        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url, error = %e, "fetch failed");
                return Err(e.into());
            }
        };

        self.store
            .set_ex(url, self.ttl_seconds, Bytes::from(html.clone()))
            .await?;

        Ok(html)
    }

    /// How many times `url` was requested through [`PageCache::get_page`].
    pub async fn access_count(&self, url: &str) -> Result<i64, PageError> {
        let Some(count) = self.store.get(&count_key(url)).await? else {
            return Ok(0);
        };

        Ok(std::str::from_utf8(&count)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(StoreError::NotAnInteger)?)
    }
}
