//! Error types for configuration loading and validation.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set and has no default.
    #[error("missing required environment variable: {key}")]
    MissingEnvVar {
        /// Environment variable name.
        key: &'static str,
    },
    /// An environment variable was set but could not be parsed into its
    /// target type.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        /// Environment variable name.
        key: &'static str,
        /// Raw string value that failed to parse.
        value: String,
        /// Human-readable reason for the failure.
        reason: String,
    },
    /// A value parsed successfully but fell outside its allowed range.
    #[error("{key} must be {constraint}, got {value}")]
    OutOfRange {
        /// Field name.
        key: &'static str,
        /// Constraint description, e.g. `"at least 5"`.
        constraint: &'static str,
        /// Offending value.
        value: i64,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
