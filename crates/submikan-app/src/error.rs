//! Application-level error taxonomy (`spec.md` §7).
//!
//! Background loops (scheduler, reconciler) only ever log these; the
//! supplemented API-surface functions propagate them so a future HTTP layer
//! can map them per §6 (`Validation` → 400, `NotFound` → 404,
//! `UpstreamUnavailable` → 503 with a retry hint, everything else → 500).

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable was not set.
    #[error("missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: &'static str,
    },
    /// Configuration loading or validation failed.
    #[error("configuration error")]
    Config(#[source] submikan_config::ConfigError),
    /// A persistence gateway operation failed.
    #[error("persistence error")]
    Data(#[source] submikan_data::DataError),
    /// A feed fetcher or parser operation failed.
    #[error("feed error")]
    Feed(#[source] submikan_feed::FeedError),
    /// A torrent-client adapter operation failed.
    #[error("torrent client error")]
    Torrent(#[source] submikan_torrent_core::TorrentError),
    /// Telemetry initialization failed.
    #[error("telemetry error")]
    Telemetry(#[source] anyhow::Error),
    /// Database pool construction failed.
    #[error("database connection error")]
    Database(#[source] sqlx::Error),
    /// Input failed validation at the API boundary (§7 `Validation`).
    #[error("validation error: {reason}")]
    Validation {
        /// Human-readable description of the invalid input.
        reason: String,
    },
    /// A referenced subscription or history row does not exist (§7 `NotFound`).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"subscription"`.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
}

impl AppError {
    /// Whether this error is transient and the caller should retry later
    /// rather than treat it as a permanent failure (§7 `UpstreamUnavailable`).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Torrent(submikan_torrent_core::TorrentError::Unavailable { .. })
        )
    }
}

impl From<submikan_config::ConfigError> for AppError {
    fn from(source: submikan_config::ConfigError) -> Self {
        Self::Config(source)
    }
}

impl From<submikan_data::DataError> for AppError {
    fn from(source: submikan_data::DataError) -> Self {
        Self::Data(source)
    }
}

impl From<submikan_feed::FeedError> for AppError {
    fn from(source: submikan_feed::FeedError) -> Self {
        Self::Feed(source)
    }
}

impl From<submikan_torrent_core::TorrentError> for AppError {
    fn from(source: submikan_torrent_core::TorrentError) -> Self {
        Self::Torrent(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_torrent_error_is_transient() {
        let err = AppError::from(submikan_torrent_core::TorrentError::Unavailable {
            reason: "timeout".to_string(),
            retry_after: None,
        });
        assert!(err.is_transient());
    }

    #[test]
    fn rejected_torrent_error_is_not_transient() {
        let err = AppError::from(submikan_torrent_core::TorrentError::Rejected {
            reason: "bad magnet".to_string(),
        });
        assert!(!err.is_transient());
    }

    #[test]
    fn not_found_renders_entity_and_id() {
        let err = AppError::NotFound {
            entity: "subscription",
            id: "42".to_string(),
        };
        assert_eq!(err.to_string(), "subscription not found: 42");
    }
}
