//! Batched HTTP fetcher
//!
//! This module fetches lists of URLs in fixed-size batches:
//! - All URLs of one batch are requested concurrently
//! - Batches run one after another, each with its own HTTP client
//! - Every URL yields its own `Result`, so one failure never hides the others
//! - Batches are produced lazily as a stream

use crate::config::CrawlerConfig;
use crate::crawler::queue::UrlQueue;
use futures::future::join_all;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use scraper::Html;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// User agent sent with every request unless configured otherwise
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:86.0) Gecko/20100101 Firefox/86.0";

/// Per-request timeout unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// The URL as it was requested, used to map results back to their source
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl FetchResult {
    /// Parses the body into an HTML document
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Failure to fetch a single URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Could not connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {reason}")]
    Body { url: String, reason: String },

    #[error("Failed to build HTTP client for {url}: {reason}")]
    Client { url: String, reason: String },
}

impl FetchError {
    /// The URL whose fetch failed
    pub fn url(&self) -> &str {
        match self {
            Self::InvalidUrl { url, .. }
            | Self::Timeout { url }
            | Self::Connect { url, .. }
            | Self::Request { url, .. }
            | Self::Status { url, .. }
            | Self::Body { url, .. }
            | Self::Client { url, .. } => url,
        }
    }
}

/// Outcome of fetching one URL
pub type FetchOutcome = Result<FetchResult, FetchError>;

/// Source of fetched pages
///
/// `fetch` returns a lazy, finite stream of batches. Every input URL appears
/// in exactly one batch, with batches in input order.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, urls: Vec<String>) -> BoxStream<'_, Vec<FetchOutcome>>;
}

/// Fetches URLs concurrently in batches of at most `batch_size`
#[derive(Debug, Clone)]
pub struct BatchFetcher {
    batch_size: usize,
    timeout: Duration,
    user_agent: String,
}

impl BatchFetcher {
    /// Creates a fetcher with the default timeout and user agent
    ///
    /// A batch size of zero is raised to one.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.fetch_batch_size)
            .with_timeout(Duration::from_secs(config.request_timeout))
            .with_user_agent(config.user_agent.clone())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Builds the HTTP client shared by the requests of one batch
    pub fn build_http_client(&self) -> Result<Client, reqwest::Error> {
        Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .build()
    }

    /// Fetches one batch concurrently
    ///
    /// # Arguments
    ///
    /// * `urls` - The URLs of the batch
    ///
    /// # Returns
    ///
    /// One outcome per input URL, in input order. If no client can be built,
    /// every URL fails with [`FetchError::Client`].
    pub async fn fetch_batch(&self, urls: Vec<String>) -> Vec<FetchOutcome> {
        tracing::debug!("Fetching batch of {} URLs", urls.len());

        // A fresh client per batch, dropped with its connections afterwards
        let client = match self.build_http_client() {
            Ok(client) => client,
            Err(e) => {
                let reason = e.to_string();
                return urls
                    .into_iter()
                    .map(|url| {
                        Err(FetchError::Client {
                            url,
                            reason: reason.clone(),
                        })
                    })
                    .collect();
            }
        };

        // join_all keeps input order
        join_all(urls.into_iter().map(|url| fetch_url(&client, url))).await
    }
}

impl Fetcher for BatchFetcher {
    fn fetch(&self, urls: Vec<String>) -> BoxStream<'_, Vec<FetchOutcome>> {
        let queue: UrlQueue = urls.into_iter().collect();

        stream::unfold(queue, move |mut queue| async move {
            let batch = queue.next_batch(self.batch_size);
            if batch.is_empty() {
                return None;
            }
            let outcomes = self.fetch_batch(batch).await;
            Some((outcomes, queue))
        })
        .boxed()
    }
}

/// Fetches a single URL with a GET request
///
/// # Arguments
///
/// * `client` - The client of the current batch
/// * `url` - The URL to fetch, echoed back in the outcome
///
/// # Returns
///
/// * `Ok(FetchResult)` - A 2xx response and its body
/// * `Err(FetchError::Status)` - Any other status
/// * `Err(FetchError)` - Invalid URL, timeout, connection or body failure
async fn fetch_url(client: &Client, url: String) -> FetchOutcome {
    // Only http(s) is fetched
    let parsed = match Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
        Ok(parsed) => {
            return Err(FetchError::InvalidUrl {
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
                url,
            })
        }
        Err(e) => {
            return Err(FetchError::InvalidUrl {
                url,
                reason: e.to_string(),
            })
        }
    };

    let response = match client.get(parsed).send().await {
        Ok(response) => response,
        Err(e) => return Err(classify_error(url, &e)),
    };

    let status = response.status();
    if !status.is_success() {
        tracing::debug!("{} answered {}", url, status);
        return Err(FetchError::Status {
            url,
            status: status.as_u16(),
        });
    }

    // The timeout also covers reading the body
    match response.text().await {
        Ok(body) => Ok(FetchResult {
            url,
            status: status.as_u16(),
            body,
        }),
        Err(e) if e.is_timeout() => Err(FetchError::Timeout { url }),
        Err(e) => Err(FetchError::Body {
            url,
            reason: e.to_string(),
        }),
    }
}

fn classify_error(url: String, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout { url }
    } else if error.is_connect() {
        FetchError::Connect {
            url,
            reason: error.to_string(),
        }
    } else {
        FetchError::Request {
            url,
            reason: error.to_string(),
        }
    }
}
