//! Error types for the persistence gateway.

use thiserror::Error;

/// Result alias for persistence gateway operations.
pub type DataResult<T> = Result<T, DataError>;

/// Errors raised by the persistence gateway.
#[derive(Debug, Error)]
pub enum DataError {
    /// Migration execution failed.
    #[error("migration failed")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),
    /// A database operation failed.
    #[error("database operation failed: {operation}")]
    QueryFailed {
        /// Operation identifier, for log correlation.
        operation: &'static str,
        /// Underlying SQL error.
        #[source]
        source: sqlx::Error,
    },
    /// The caller passed a hash that does not normalize to 40-character
    /// uppercase hex.
    #[error("invalid torrent hash: {hash}")]
    InvalidHash {
        /// The offending raw hash.
        hash: String,
    },
    /// A referenced row (subscription, history entry) does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"subscription"`.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_entity_and_id() {
        let err = DataError::NotFound {
            entity: "subscription",
            id: "42".to_string(),
        };
        assert_eq!(err.to_string(), "subscription not found: 42");
    }

    #[test]
    fn invalid_hash_renders_offending_value() {
        let err = DataError::InvalidHash {
            hash: "nope".to_string(),
        };
        assert_eq!(err.to_string(), "invalid torrent hash: nope");
    }
}
