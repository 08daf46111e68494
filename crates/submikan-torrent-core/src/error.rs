//! Error taxonomy for the torrent-client adapter boundary.

use chrono::{DateTime, Utc};

/// Result alias for torrent-client operations.
pub type TorrentResult<T> = std::result::Result<T, TorrentError>;

/// Errors surfaced by a [`crate::TorrentClient`] implementation.
///
/// The two variants mirror the upstream qBittorrent WebUI API's failure shape:
/// connection/availability problems (retryable) versus explicit request
/// rejections (not retryable without changing the request).
#[derive(Debug, thiserror::Error)]
pub enum TorrentError {
    /// The client could not be reached, or responded with a 5xx status.
    /// Connection refused, DNS failure, and request timeouts all land here.
    #[error("torrent client unavailable: {reason}")]
    Unavailable {
        /// Human-readable description of the failure.
        reason: String,
        /// When the caller should consider retrying, if known.
        retry_after: Option<DateTime<Utc>>,
    },
    /// The client reached the server but it rejected the request (4xx),
    /// e.g. an invalid magnet link or an unknown hash.
    #[error("torrent client rejected request: {reason}")]
    Rejected {
        /// Human-readable description of the rejection.
        reason: String,
    },
}

impl TorrentError {
    /// Whether this failure is transient and safe to retry on the next tick.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_transient_rejected_is_not() {
        let unavailable = TorrentError::Unavailable {
            reason: "timeout".into(),
            retry_after: None,
        };
        let rejected = TorrentError::Rejected {
            reason: "invalid magnet".into(),
        };
        assert!(unavailable.is_transient());
        assert!(!rejected.is_transient());
    }
}
