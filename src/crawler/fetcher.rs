//! Rate-limited page fetching
//!
//! This module handles every request the harvester makes:
//! - Building the HTTP client (user agent, timeout, optional proxy)
//! - Mapping transport and HTTP failures to `TransientNetwork`
//! - The inter-request delay applied between pages
//!
//! A single fetch never sleeps. The delay is applied by the caller between
//! pages through [`Fetcher::pause`]; retries wait on their own schedule.

use crate::config::FetchConfig;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::sync::Arc;
use std::time::Duration;

/// Anything that can turn a URL into page text
///
/// Implementations must fail with [`HarvestError::TransientNetwork`] on any
/// transport-level problem so that the retry policy can pick it up.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError>;
}

/// [`PageSource`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self, HarvestError> {
        Ok(Self::new(build_http_client(config)?))
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transient(url, describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(transient(url, format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| transient(url, format!("failed to read body: {}", e)))
    }
}

fn transient(url: &str, message: String) -> HarvestError {
    HarvestError::TransientNetwork {
        url: url.to_string(),
        message,
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Bad proxy URL or TLS backend failure
///
/// # Example
///
/// ```no_run
/// use forum_harvest::config::FetchConfig;
/// use forum_harvest::crawler::build_http_client;
///
/// let config = FetchConfig {
///     proxy_url: Some("http://127.0.0.1:3128".to_string()),
///     ..FetchConfig::default()
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let user_agent = config.user_agent.clone().unwrap_or_else(|| {
        format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    });

    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(config.timeout())
        .connect_timeout(config.timeout().min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = &config.proxy_url {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// Page source plus the minimum delay between consecutive pages
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn PageSource>,
    request_delay: Duration,
}

impl Fetcher {
    pub fn new(source: Arc<dyn PageSource>, request_delay: Duration) -> Self {
        Self {
            source,
            request_delay,
        }
    }

    /// HTTP-backed fetcher honoring the configured delay and proxy
    pub fn from_config(config: &FetchConfig) -> Result<Self, HarvestError> {
        let source = HttpSource::from_config(config)?;
        Ok(Self::new(Arc::new(source), config.request_delay()))
    }

    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    /// Fetches one page; no delay is applied here
    pub async fn fetch(&self, url: &str) -> Result<String, HarvestError> {
        tracing::debug!("Fetching {}", url);
        self.source.fetch(url).await
    }

    /// Waits out the inter-request delay
    pub async fn pause(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("request_delay", &self.request_delay)
            .finish_non_exhaustive()
    }
}
