//! Page fetching.
//!
//! Strategies consume the [`Fetcher`] trait so the transport is pluggable;
//! the default implementation is plain HTTP via reqwest. Options that only a
//! browser-based fetcher can honor (cookie banners, wait-for markers) pass
//! through the same surface and are ignored here.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::models::SourceConfig;

/// Errors from page retrieval.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("invalid proxy configuration: {0}")]
    Proxy(String),
}

/// Per-request fetch options.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// CSS selector of a cookie-acceptance control to click before reading
    /// the page (browser fetchers only).
    pub cookie_selector: Option<String>,
    /// Element to wait for before the page counts as loaded (browser
    /// fetchers only).
    pub wait_for: Option<String>,
    /// Route this request through the configured proxy.
    pub use_proxy: bool,
}

impl FetchOptions {
    /// Build fetch options from a source's configuration.
    pub fn from_source(config: &SourceConfig) -> Self {
        Self {
            cookie_selector: config.cookie_selector.clone(),
            wait_for: config.wait_for.clone(),
            use_proxy: config.use_proxy,
        }
    }
}

/// Retrieves page content by URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch raw bytes from a URL.
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Vec<u8>, FetchError>;

    /// Fetch page content as text.
    async fn fetch_text(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        let bytes = self.fetch(url, options).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Plain HTTP fetcher with randomized politeness delays.
pub struct HttpFetcher {
    client: reqwest::Client,
    proxied_client: Option<reqwest::Client>,
    base_delay: Duration,
    jitter_ms: u64,
}

impl HttpFetcher {
    /// Create a fetcher with the given timeout, base delay, and jitter range.
    pub fn new(
        timeout: Duration,
        base_delay: Duration,
        jitter_ms: u64,
        proxy: Option<&str>,
    ) -> Result<Self, FetchError> {
        let builder = || {
            reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .timeout(timeout)
                .gzip(true)
                .brotli(true)
        };
        let client = builder().build()?;
        let proxied_client = match proxy {
            Some(url) => {
                let proxy = reqwest::Proxy::all(url)
                    .map_err(|e| FetchError::Proxy(format!("{url}: {e}")))?;
                Some(builder().proxy(proxy).build()?)
            }
            None => None,
        };
        Ok(Self {
            client,
            proxied_client,
            base_delay,
            jitter_ms,
        })
    }

    /// Randomized pause between remote requests. Pacing only, not
    /// scheduling backpressure.
    async fn pace(&self) {
        let jitter_ms = if self.jitter_ms > 0 {
            rand::rng().random_range(0..=self.jitter_ms)
        } else {
            0
        };
        let delay = self.base_delay + Duration::from_millis(jitter_ms);
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Default user agent string.
pub const USER_AGENT: &str = concat!("periodica/", env!("CARGO_PKG_VERSION"));

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<Vec<u8>, FetchError> {
        let client = if options.use_proxy {
            self.proxied_client.as_ref().unwrap_or(&self.client)
        } else {
            &self.client
        };

        debug!("Fetching {}", url);
        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            self.pace().await;
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?.to_vec();
        self.pace().await;
        Ok(bytes)
    }
}

#[cfg(test)]
pub mod stub {
    //! In-memory fetcher for traversal and ingestion tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Canned responses keyed by URL; unknown URLs fail with status 404.
    pub struct StubFetcher {
        pages: HashMap<String, Vec<u8>>,
        requested: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self {
                pages: HashMap::new(),
                requested: Mutex::new(Vec::new()),
            }
        }

        pub fn with_page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            self.pages.insert(url.to_string(), body.into());
            self
        }

        /// URLs requested so far, in order.
        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<Vec<u8>, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(body) => Ok(body.clone()),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }
}
