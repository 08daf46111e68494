#![forbid(unsafe_code)]
#![deny(
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
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

//! Persistence gateway for the subscription polling and download-lifecycle
//! engine.
//!
//! Each table in `spec.md` §3 gets one repository: [`subscriptions`],
//! [`download_history`], [`feed_cache`], [`subgroup_mapping`]. [`Gateway`]
//! bundles all four behind a single connection pool and runs migrations on
//! construction. Every caller obtains its own unit-of-work from the
//! gateway rather than sharing a session across concurrent branches — the
//! concurrency note in `spec.md` §4.8.

pub mod download_history;
pub mod error;
pub mod feed_cache;
pub mod models;
pub mod subgroup_mapping;
pub mod subscriptions;

use sqlx::PgPool;

pub use download_history::DownloadHistoryRepo;
pub use error::{DataError, DataResult};
pub use feed_cache::FeedCacheRepo;
pub use subgroup_mapping::SubgroupMappingRepo;
pub use subscriptions::SubscriptionRepo;

/// Bundles the repositories behind one connection pool.
///
/// Cloning a [`Gateway`] is cheap: each repository wraps the same
/// `sqlx::PgPool`, which is itself a cheap-to-clone connection pool handle.
#[derive(Clone)]
pub struct Gateway {
    /// Subscription repository.
    pub subscriptions: SubscriptionRepo,
    /// Download-history repository.
    pub download_history: DownloadHistoryRepo,
    /// Feed-cache repository.
    pub feed_cache: FeedCacheRepo,
    /// Subgroup-mapping repository.
    pub subgroup_mapping: SubgroupMappingRepo,
}

impl Gateway {
    /// Run pending migrations against `pool` and build a [`Gateway`] over
    /// it.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub async fn new(pool: PgPool) -> DataResult<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DataError::MigrationFailed)?;

        Ok(Self {
            subscriptions: SubscriptionRepo::new(pool.clone()),
            download_history: DownloadHistoryRepo::new(pool.clone()),
            feed_cache: FeedCacheRepo::new(pool.clone()),
            subgroup_mapping: SubgroupMappingRepo::new(pool),
        })
    }
}
