//! Heimdall error types

use serde::Serialize;

/// Heimdall error types
#[derive(Debug, thiserror::Error)]
pub enum HeimdallError {
    // Upstream/network errors
    /// Connection failure or read timeout. Retried by the fetcher and never
    /// returned from [`UpstreamFetcher::fetch`](crate::fetch::UpstreamFetcher::fetch)
    /// once the attempt budget is spent.
    #[error("transient upstream failure: {message}")]
    Transient { message: String, timed_out: bool },

    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("upstream client error ({status}): {message}")]
    UpstreamClient { status: u16, message: String },

    #[error("upstream server error ({status}): {message}")]
    UpstreamServer { status: u16, message: String },

    // Read-path errors
    #[error("{0}")]
    NoData(String),

    #[error("{0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Upstream answered, but the payload could not be shaped into a record.
    #[error("unexpected payload: {0}")]
    Shape(String),

    #[error("storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable, serializable error code reported to read-path consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NoData,
    ValidationError,
    #[serde(rename = "UPSTREAM_4XX")]
    Upstream4xx,
    #[serde(rename = "UPSTREAM_5XX")]
    Upstream5xx,
    RateLimited,
    NotFound,
    InternalError,
}

impl ErrorKind {
    /// The wire code, e.g. `"NO_DATA"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NoData => "NO_DATA",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::Upstream4xx => "UPSTREAM_4XX",
            ErrorKind::Upstream5xx => "UPSTREAM_5XX",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HeimdallError {
    /// Whether the fetcher should retry after this error.
    ///
    /// Only connection failures and timeouts qualify. Rate limiting and
    /// erroring HTTP responses are handed back to the caller untouched.
    pub fn is_transient(&self) -> bool {
        matches!(self, HeimdallError::Transient { .. })
    }

    /// Convert a transient failure into the error surfaced once retries are
    /// exhausted: a synthetic 504 for timeouts, 503 for connection failures.
    /// Any other error is returned unchanged.
    pub fn into_exhausted(self) -> Self {
        match self {
            HeimdallError::Transient { message, timed_out } => HeimdallError::UpstreamServer {
                status: if timed_out { 504 } else { 503 },
                message,
            },
            other => other,
        }
    }

    /// Stable code for the read-path consumer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HeimdallError::NoData(_) => ErrorKind::NoData,
            HeimdallError::NotFound(_) => ErrorKind::NotFound,
            HeimdallError::Validation(_) => ErrorKind::ValidationError,
            HeimdallError::RateLimited(_) => ErrorKind::RateLimited,
            HeimdallError::UpstreamClient { .. } => ErrorKind::Upstream4xx,
            HeimdallError::UpstreamServer { .. } | HeimdallError::Transient { .. } => {
                ErrorKind::Upstream5xx
            }
            HeimdallError::Json(_)
            | HeimdallError::Shape(_)
            | HeimdallError::Storage(_)
            | HeimdallError::Configuration(_)
            | HeimdallError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Upstream HTTP status carried by this error, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            HeimdallError::UpstreamClient { status, .. }
            | HeimdallError::UpstreamServer { status, .. } => Some(*status),
            HeimdallError::RateLimited(_) => Some(429),
            _ => None,
        }
    }
}

/// Result type alias for Heimdall operations
pub type Result<T> = std::result::Result<T, HeimdallError>;
