//! Environment-variable loading helpers.
//!
//! Every key is read under the `SUBMIKAN_` prefix. A missing variable falls
//! back to its default; a present-but-unparseable variable is an error.

use std::env;
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};

pub(crate) fn env_var(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

pub(crate) fn required(key: &'static str) -> ConfigResult<String> {
    env_var(key).ok_or(ConfigError::MissingEnvVar { key })
}

pub(crate) fn parsed_or<T>(key: &'static str, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(value) => value.parse().map_err(|err: T::Err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        }),
        None => Ok(default),
    }
}

pub(crate) fn string_or(key: &'static str, default: &str) -> String {
    env_var(key).unwrap_or_else(|| default.to_string())
}

pub(crate) fn tags_or(key: &'static str, default: &[&str]) -> Vec<String> {
    match env_var(key) {
        Some(value) => value
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(ToString::to_string)
            .collect(),
        None => default.iter().map(ToString::to_string).collect(),
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn tags_or_splits_and_trims() {
        // SAFETY: test-only, single-threaded env mutation guarded by no parallel access to this key.
        unsafe {
            env::set_var("SUBMIKAN_TEST_TAGS", "a, b ,c");
        }
        assert_eq!(tags_or("SUBMIKAN_TEST_TAGS", &[]), vec!["a", "b", "c"]);
        unsafe {
            env::remove_var("SUBMIKAN_TEST_TAGS");
        }
    }

    #[test]
    fn tags_or_falls_back_to_default() {
        unsafe {
            env::remove_var("SUBMIKAN_TEST_TAGS_MISSING");
        }
        assert_eq!(
            tags_or("SUBMIKAN_TEST_TAGS_MISSING", &["submikan"]),
            vec!["submikan"]
        );
    }
}
