//! Upstream Fetcher: bounded-retry HTTP GETs against one upstream endpoint.
//!
//! Every call goes through [`retry::with_retry`], so the classification in
//! [`UpstreamFetcher::attempt`] decides what is retried:
//!
//! | Outcome                         | Error                         | Retried |
//! |---------------------------------|-------------------------------|---------|
//! | connect failure                 | `Transient` → 503 when spent  | yes     |
//! | timeout (connect, read, total)  | `Transient` → 504 when spent  | yes     |
//! | HTTP 429                        | `RateLimited`                 | no      |
//! | HTTP 4xx                        | `UpstreamClient`              | no      |
//! | HTTP 5xx                        | `UpstreamServer`              | no      |
//! | 2xx with a non-JSON body        | `Shape`                       | no      |

pub mod retry;

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::telemetry;
use crate::{HeimdallError, Result};

pub use retry::RetryConfig;

/// Default whole-call timeout for one HTTP attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One upstream request: an absolute URL plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl FetchTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// `scheme://host[:port]` of the target, used for logs and metric labels.
    pub fn origin(&self) -> String {
        match reqwest::Url::parse(&self.url) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(_) => self.url.clone(),
        }
    }
}

/// HTTP client with a fixed timeout and retry budget.
///
/// Cheap to share behind an `Arc`; the inner connection pool is reused
/// across calls and no other state is kept between them.
#[derive(Clone)]
pub struct UpstreamFetcher {
    http: Client,
    retry: RetryConfig,
    timeout: Duration,
}

impl UpstreamFetcher {
    /// Build a fetcher with the given per-attempt timeout and retry policy.
    pub fn new(timeout: Duration, retry: RetryConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("heimdall/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HeimdallError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            retry,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// GET `target` and decode the body as JSON, retrying transient failures.
    pub async fn fetch(&self, target: &FetchTarget) -> Result<Value> {
        let origin = target.origin();
        let start = Instant::now();
        let result = retry::with_retry(&self.retry, &origin, || self.attempt(target, &origin)).await;
        metrics::histogram!(telemetry::UPSTREAM_DURATION_SECONDS, "host" => origin.clone())
            .record(start.elapsed().as_secs_f64());
        result
    }

    /// A single attempt, classified for the retry loop.
    async fn attempt(&self, target: &FetchTarget, origin: &str) -> Result<Value> {
        let result = self.send(target).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::UPSTREAM_REQUESTS_TOTAL,
            "host" => origin.to_owned(),
            "status" => status,
        )
        .increment(1);
        result
    }

    async fn send(&self, target: &FetchTarget) -> Result<Value> {
        debug!(url = %target.url, "fetching upstream");
        let response = self
            .http
            .get(&target.url)
            .query(&target.query)
            .send()
            .await
            .map_err(|e| classify_send_error(&target.url, e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(url = %target.url, "rate limited by upstream");
            return Err(HeimdallError::RateLimited(format!(
                "Rate limited by {}",
                target.origin()
            )));
        }
        if status.is_client_error() {
            warn!(url = %target.url, status = status.as_u16(), "upstream client error");
            return Err(HeimdallError::UpstreamClient {
                status: status.as_u16(),
                message: format!("Upstream API error: {}", status.as_u16()),
            });
        }
        if status.is_server_error() {
            warn!(url = %target.url, status = status.as_u16(), "upstream server error");
            return Err(HeimdallError::UpstreamServer {
                status: status.as_u16(),
                message: format!("Upstream API error: {}", status.as_u16()),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                HeimdallError::Transient {
                    message: format!("Timeout reading body from {}", target.url),
                    timed_out: true,
                }
            } else {
                HeimdallError::Shape(format!("invalid JSON from {}: {e}", target.url))
            }
        })
    }
}

fn classify_send_error(url: &str, e: reqwest::Error) -> HeimdallError {
    if e.is_timeout() {
        warn!(url, "timeout fetching upstream");
        HeimdallError::Transient {
            message: format!("Timeout fetching {url}"),
            timed_out: true,
        }
    } else if e.is_connect() {
        warn!(url, error = %e, "connection error fetching upstream");
        HeimdallError::Transient {
            message: format!("Connection error fetching {url}: {e}"),
            timed_out: false,
        }
    } else {
        HeimdallError::UpstreamServer {
            status: 502,
            message: format!("Request to {url} failed: {e}"),
        }
    }
}
