//! Search backend error types.

use thiserror::Error;

/// Errors a search backend can report for a single query.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The backend answered with a non-success HTTP status.
    #[error("HTTP {status} from {backend}: {message}")]
    Http {
        backend: String,
        status: u16,
        message: String,
    },

    /// The backend returned a rate-limit response.
    #[error("rate limited by {backend}")]
    RateLimited { backend: String },

    /// The backend did not answer in time.
    #[error("timed out waiting for {backend}")]
    Timeout { backend: String },

    /// A response from the backend could not be parsed.
    #[error("parse error from {backend}: {message}")]
    Parse { backend: String, message: String },

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

impl SearchError {
    /// Returns `true` when the error is transient and the query may
    /// succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500,
            Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            Self::Parse { .. } => false,
        }
    }

    /// Returns `true` when the error is a timeout of any kind.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Request(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Convenience alias for search results.
pub type SearchResult<T> = std::result::Result<T, SearchError>;
