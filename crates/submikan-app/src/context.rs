//! Shared dependency bundle passed to the scheduler, pipeline, download
//! controller, progress reconciler, and the supplemented API-surface
//! operations.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use submikan_config::AppConfig;
use submikan_data::Gateway;
use submikan_feed::FeedFetcher;
use submikan_telemetry::Metrics;
use submikan_torrent_core::TorrentClient;
use submikan_torrent_qbit::{QbitClient, QbitConfig};

use crate::error::{AppError, AppResult};

/// Bundles the persistence gateway, external adapters, metrics, and loaded
/// configuration that every background service depends on.
///
/// Cloning an [`AppContext`] is cheap: [`Gateway`] wraps a connection pool
/// handle, and every other field is behind an `Arc` or is itself
/// cheap-to-clone.
#[derive(Clone)]
pub struct AppContext {
    /// Persistence gateway.
    pub gateway: Gateway,
    /// Upstream RSS feed fetcher.
    pub feed: Arc<FeedFetcher>,
    /// Torrent client adapter.
    pub torrent: Arc<dyn TorrentClient>,
    /// Metrics registry.
    pub metrics: Metrics,
    /// Loaded process configuration.
    pub config: Arc<AppConfig>,
}

impl AppContext {
    /// Build the production dependency bundle: connect to Postgres, run
    /// migrations, build the qBittorrent adapter and feed fetcher, and
    /// register the metrics registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database pool cannot be built, migrations
    /// fail, or the feed/torrent HTTP clients cannot be constructed.
    pub async fn build(config: AppConfig, database_url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(AppError::Database)?;

        let gateway = Gateway::new(pool).await?;

        let feed = FeedFetcher::with_timeout_and_ttl(
            config.mikan_base_url.clone(),
            Duration::from_secs(config.feed_fetch_timeout_seconds),
            Duration::from_secs(60),
        )?;

        let qbit_config = QbitConfig::new(
            config.torrent_client.base_url(),
            config.torrent_client.username.clone(),
            config.torrent_client.password.clone(),
        );
        let torrent = QbitClient::new(qbit_config)?;

        let metrics = Metrics::new().map_err(AppError::Telemetry)?;

        Ok(Self {
            gateway,
            feed: Arc::new(feed),
            torrent: Arc::new(torrent),
            metrics,
            config: Arc::new(config),
        })
    }
}
