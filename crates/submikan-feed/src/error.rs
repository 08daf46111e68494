//! Error taxonomy for feed retrieval.

use thiserror::Error;

/// Result alias for feed fetcher/parser operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Errors surfaced by [`crate::FeedFetcher`].
///
/// Per-request retries are deliberately not performed here — `spec.md` §4.2
/// makes retry the scheduler's per-tick responsibility so a flaky upstream
/// never causes a tight retry loop.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Connection could not be established, or was reset mid-transfer.
    #[error("network error: {0}")]
    NetworkError(String),
    /// The request exceeded its configured timeout.
    #[error("request timed out")]
    Timeout,
    /// The upstream responded with a non-2xx status.
    #[error("upstream responded with status {0}")]
    HttpStatus(u16),
    /// The caller's cancellation signal fired before the request completed.
    #[error("request cancelled")]
    Cancelled,
    /// The response body could not be parsed as RSS/XML.
    #[error("failed to parse feed: {0}")]
    ParseError(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::HttpStatus(status.as_u16())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}
