//! HTTP fetching shared by every source
//!
//! The upstream sites serve different content to obvious bots, so every
//! request carries browser-like headers. Pages are cached in memory for the
//! lifetime of one [`Fetcher`] so that datasets reading the same page in a
//! run download it once.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use bytes::Bytes;
use lru::LruCache;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::Result;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
pub const DEFAULT_REFERER: &str = "https://www.google.com/";
pub const DEFAULT_PAGE_CACHE_SIZE: usize = 32;

/// Default headers sent with every request.
pub fn browser_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    h.insert(REFERER, HeaderValue::from_static(DEFAULT_REFERER));
    h.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
    );
    h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    h
}

/// One HTTP client plus an LRU cache of response bodies keyed by URL.
pub struct Fetcher {
    client: Client,
    pages: Mutex<LruCache<String, Bytes>>,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Self::with_cache_size(DEFAULT_PAGE_CACHE_SIZE)
    }

    /// A fetcher whose page cache holds at most `capacity` bodies.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_cache_size(capacity: usize) -> Result<Self> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .build()?;
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            client,
            pages: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// The underlying client, for requests that must bypass the page cache.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url` and return the body; non-2xx responses are errors.
    pub async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        if let Some(body) = self.cached(url) {
            debug!(url, "page cache hit");
            return Ok(body);
        }

        debug!(url, "fetching");
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        if let Ok(mut pages) = self.pages.lock() {
            pages.put(url.to_string(), body.clone());
        }
        Ok(body)
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let body = self.get_bytes(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_bytes(url).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Number of bodies currently cached.
    pub fn cached_pages(&self) -> usize {
        self.pages.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn cached(&self, url: &str) -> Option<Bytes> {
        self.pages.lock().ok()?.get(url).cloned()
    }
}
