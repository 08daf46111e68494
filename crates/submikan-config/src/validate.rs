//! Cross-field validation applied after loading.

use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;

const MIN_POLLING_INTERVAL_MINUTES: u32 = 5;

/// Validate an [`AppConfig`], returning the first violated constraint.
pub fn validate(config: &AppConfig) -> ConfigResult<()> {
    if config.polling_interval_minutes < MIN_POLLING_INTERVAL_MINUTES {
        return Err(ConfigError::OutOfRange {
            key: "polling_interval_minutes",
            constraint: "at least 5",
            value: i64::from(config.polling_interval_minutes),
        });
    }
    if config.max_subscriptions_per_poll == 0 {
        return Err(ConfigError::OutOfRange {
            key: "max_subscriptions_per_poll",
            constraint: "at least 1",
            value: i64::from(config.max_subscriptions_per_poll),
        });
    }
    if config.max_concurrent_fetches == 0 {
        return Err(ConfigError::OutOfRange {
            key: "max_concurrent_fetches",
            constraint: "at least 1",
            value: config.max_concurrent_fetches as i64,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TorrentClientConfig;

    fn base_config() -> AppConfig {
        AppConfig {
            polling_interval_minutes: 30,
            max_subscriptions_per_poll: 50,
            startup_delay_seconds: 30,
            enable_polling: true,
            feed_fetch_timeout_seconds: 30,
            mikan_base_url: "https://mikanani.me".to_string(),
            torrent_client: TorrentClientConfig {
                host: "localhost".to_string(),
                port: 8080,
                username: "admin".to_string(),
                password: "secret".to_string(),
                default_save_path: "/downloads".to_string(),
                category: "submikan".to_string(),
                tags: vec![],
            },
            progress_sync_interval_seconds: 30,
            max_concurrent_fetches: 3,
        }
    }

    #[test]
    fn accepts_defaults() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn rejects_polling_interval_below_minimum() {
        let mut config = base_config();
        config.polling_interval_minutes = 1;
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { key: "polling_interval_minutes", .. }));
    }

    #[test]
    fn rejects_zero_max_concurrent_fetches() {
        let mut config = base_config();
        config.max_concurrent_fetches = 0;
        assert!(validate(&config).is_err());
    }
}
