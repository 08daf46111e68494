//! Typed configuration values.

use serde::{Deserialize, Serialize};

/// Connection and defaults for the torrent client adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentClientConfig {
    /// WebUI host, e.g. `localhost`.
    pub host: String,
    /// WebUI port.
    pub port: u16,
    /// WebUI account username.
    pub username: String,
    /// WebUI account password.
    pub password: String,
    /// Default save path applied when a subscription does not override it.
    pub default_save_path: String,
    /// Category label applied to torrents added by this application.
    pub category: String,
    /// Tags applied to torrents added by this application.
    pub tags: Vec<String>,
}

impl TorrentClientConfig {
    /// Base URL built from `host`/`port`, e.g. `http://localhost:8080`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Full process configuration for the scheduler, feed fetcher, and download
/// controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scheduler tick period, in minutes. Must be at least 5.
    pub polling_interval_minutes: u32,
    /// Maximum number of subscriptions visited per scheduler tick.
    pub max_subscriptions_per_poll: u32,
    /// Delay before the first scheduler tick after startup.
    pub startup_delay_seconds: u64,
    /// Master switch for the scheduler; when `false` no ticks fire.
    pub enable_polling: bool,
    /// Timeout applied to each feed fetch HTTP request.
    pub feed_fetch_timeout_seconds: u64,
    /// Base URL of the upstream RSS-indexing site, e.g. `https://mikanani.me`.
    pub mikan_base_url: String,
    /// Torrent client connection settings.
    pub torrent_client: TorrentClientConfig,
    /// Period between progress reconciler passes.
    pub progress_sync_interval_seconds: u64,
    /// Maximum number of feed fetches in flight at once.
    pub max_concurrent_fetches: usize,
}
