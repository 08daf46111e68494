#![deny(
    unsafe_code,
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! Process configuration for the scheduler, feed fetcher, and torrent client
//! adapter.
//!
//! Configuration is loaded once at startup from environment variables (see
//! [`loader`]) and validated (see [`validate`]) before the application wires
//! up its components. There is no hot-reload path: operators restart the
//! process to pick up a changed value.

mod defaults;
mod error;
mod loader;
mod model;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{AppConfig, TorrentClientConfig};
pub use validate::validate;

impl AppConfig {
    /// Load configuration from environment variables, applying defaults for
    /// anything unset, then validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable (torrent client username or
    /// password) is missing, if a present variable fails to parse, or if the
    /// loaded configuration violates a cross-field constraint.
    pub fn from_env() -> ConfigResult<Self> {
        let config = Self {
            polling_interval_minutes: loader::parsed_or(
                "SUBMIKAN_POLLING_INTERVAL_MINUTES",
                defaults::POLLING_INTERVAL_MINUTES,
            )?,
            max_subscriptions_per_poll: loader::parsed_or(
                "SUBMIKAN_MAX_SUBSCRIPTIONS_PER_POLL",
                defaults::MAX_SUBSCRIPTIONS_PER_POLL,
            )?,
            startup_delay_seconds: loader::parsed_or(
                "SUBMIKAN_STARTUP_DELAY_SECONDS",
                defaults::STARTUP_DELAY_SECONDS,
            )?,
            enable_polling: loader::parsed_or("SUBMIKAN_ENABLE_POLLING", defaults::ENABLE_POLLING)?,
            feed_fetch_timeout_seconds: loader::parsed_or(
                "SUBMIKAN_FEED_FETCH_TIMEOUT_SECONDS",
                defaults::FEED_FETCH_TIMEOUT_SECONDS,
            )?,
            mikan_base_url: loader::string_or("SUBMIKAN_MIKAN_BASE_URL", defaults::MIKAN_BASE_URL),
            torrent_client: TorrentClientConfig {
                host: loader::string_or("SUBMIKAN_TORRENT_HOST", defaults::TORRENT_CLIENT_HOST),
                port: loader::parsed_or("SUBMIKAN_TORRENT_PORT", defaults::TORRENT_CLIENT_PORT)?,
                username: loader::required("SUBMIKAN_TORRENT_USERNAME")?,
                password: loader::required("SUBMIKAN_TORRENT_PASSWORD")?,
                default_save_path: loader::string_or(
                    "SUBMIKAN_TORRENT_DEFAULT_SAVE_PATH",
                    defaults::TORRENT_CLIENT_DEFAULT_SAVE_PATH,
                ),
                category: loader::string_or(
                    "SUBMIKAN_TORRENT_CATEGORY",
                    defaults::TORRENT_CLIENT_CATEGORY,
                ),
                tags: loader::tags_or("SUBMIKAN_TORRENT_TAGS", &[]),
            },
            progress_sync_interval_seconds: loader::parsed_or(
                "SUBMIKAN_PROGRESS_SYNC_INTERVAL_SECONDS",
                defaults::PROGRESS_SYNC_INTERVAL_SECONDS,
            )?,
            max_concurrent_fetches: loader::parsed_or(
                "SUBMIKAN_MAX_CONCURRENT_FETCHES",
                defaults::MAX_CONCURRENT_FETCHES,
            )?,
        };

        validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "SUBMIKAN_POLLING_INTERVAL_MINUTES",
            "SUBMIKAN_MAX_SUBSCRIPTIONS_PER_POLL",
            "SUBMIKAN_STARTUP_DELAY_SECONDS",
            "SUBMIKAN_ENABLE_POLLING",
            "SUBMIKAN_FEED_FETCH_TIMEOUT_SECONDS",
            "SUBMIKAN_MIKAN_BASE_URL",
            "SUBMIKAN_TORRENT_HOST",
            "SUBMIKAN_TORRENT_PORT",
            "SUBMIKAN_TORRENT_USERNAME",
            "SUBMIKAN_TORRENT_PASSWORD",
            "SUBMIKAN_TORRENT_DEFAULT_SAVE_PATH",
            "SUBMIKAN_TORRENT_CATEGORY",
            "SUBMIKAN_TORRENT_TAGS",
            "SUBMIKAN_PROGRESS_SYNC_INTERVAL_SECONDS",
            "SUBMIKAN_MAX_CONCURRENT_FETCHES",
        ] {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn from_env_requires_torrent_credentials() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar { key: "SUBMIKAN_TORRENT_USERNAME" }));
    }

    #[test]
    fn from_env_applies_defaults_once_credentials_are_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("SUBMIKAN_TORRENT_USERNAME", "admin");
            env::set_var("SUBMIKAN_TORRENT_PASSWORD", "secret");
        }
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.polling_interval_minutes, defaults::POLLING_INTERVAL_MINUTES);
        assert_eq!(config.torrent_client.category, defaults::TORRENT_CLIENT_CATEGORY);
        clear_env();
    }

    #[test]
    fn from_env_rejects_invalid_polling_interval() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var("SUBMIKAN_TORRENT_USERNAME", "admin");
            env::set_var("SUBMIKAN_TORRENT_PASSWORD", "secret");
            env::set_var("SUBMIKAN_POLLING_INTERVAL_MINUTES", "1");
        }
        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "polling_interval_minutes", .. }));
        clear_env();
    }
}
