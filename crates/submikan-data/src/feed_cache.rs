//! Repository for the `feed_cache_header`/`feed_cache_item` tables.
//!
//! A refresh fully replaces the header and its items atomically (`spec.md`
//! §3): the old items are deleted and the new ones inserted inside one
//! transaction, so a reader never observes a header from one refresh paired
//! with items from another.

use sqlx::PgPool;

use crate::error::{DataError, DataResult};
use crate::models::{FeedCacheHeader, FeedCacheItem};

/// Repository over the feed-cache tables.
#[derive(Clone)]
pub struct FeedCacheRepo {
    pool: PgPool,
}

impl FeedCacheRepo {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the cached header for an upstream feed, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_header(&self, mikan_id: &str) -> DataResult<Option<FeedCacheHeader>> {
        sqlx::query_as::<_, FeedCacheHeader>(
            "SELECT * FROM feed_cache_header WHERE mikan_bangumi_id = $1",
        )
        .bind(mikan_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "get_header",
            source,
        })
    }

    /// Fetch the cached items for an upstream feed, sorted by publish time
    /// descending, as `submikan-feed` produces them.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_items(&self, mikan_id: &str) -> DataResult<Vec<FeedCacheItem>> {
        sqlx::query_as::<_, FeedCacheItem>(
            "SELECT title, torrent_url, magnet_link, torrent_hash, can_download, file_size, \
             formatted_size, published_at, resolution, subgroup, subtitle_type, episode, \
             is_collection \
             FROM feed_cache_item WHERE mikan_bangumi_id = $1 ORDER BY published_at DESC",
        )
        .bind(mikan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "get_items",
            source,
        })
    }

    /// Atomically replace the header and its items for one upstream feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; no partial replacement is
    /// left committed.
    pub async fn replace(
        &self,
        header: &FeedCacheHeader,
        items: &[FeedCacheItem],
    ) -> DataResult<()> {
        let mut tx = self.pool.begin().await.map_err(|source| DataError::QueryFailed {
            operation: "feed_cache.replace.begin",
            source,
        })?;

        sqlx::query(
            r"
            INSERT INTO feed_cache_header (
                mikan_bangumi_id, season_name, latest_episode, latest_published_at,
                latest_title, episode_offset, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, now())
            ON CONFLICT (mikan_bangumi_id) DO UPDATE SET
                season_name = EXCLUDED.season_name,
                latest_episode = EXCLUDED.latest_episode,
                latest_published_at = EXCLUDED.latest_published_at,
                latest_title = EXCLUDED.latest_title,
                episode_offset = EXCLUDED.episode_offset,
                updated_at = now()
            ",
        )
        .bind(&header.mikan_bangumi_id)
        .bind(&header.season_name)
        .bind(header.latest_episode)
        .bind(header.latest_published_at)
        .bind(&header.latest_title)
        .bind(header.episode_offset)
        .execute(&mut *tx)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "feed_cache.replace.header",
            source,
        })?;

        sqlx::query("DELETE FROM feed_cache_item WHERE mikan_bangumi_id = $1")
            .bind(&header.mikan_bangumi_id)
            .execute(&mut *tx)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "feed_cache.replace.clear_items",
                source,
            })?;

        for item in items {
            sqlx::query(
                r"
                INSERT INTO feed_cache_item (
                    mikan_bangumi_id, title, torrent_url, magnet_link, torrent_hash,
                    can_download, file_size, formatted_size, published_at, resolution,
                    subgroup, subtitle_type, episode, is_collection
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                ",
            )
            .bind(&header.mikan_bangumi_id)
            .bind(&item.title)
            .bind(&item.torrent_url)
            .bind(&item.magnet_link)
            .bind(&item.torrent_hash)
            .bind(item.can_download)
            .bind(item.file_size)
            .bind(&item.formatted_size)
            .bind(item.published_at)
            .bind(&item.resolution)
            .bind(&item.subgroup)
            .bind(&item.subtitle_type)
            .bind(item.episode)
            .bind(item.is_collection)
            .execute(&mut *tx)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "feed_cache.replace.insert_item",
                source,
            })?;
        }

        tx.commit().await.map_err(|source| DataError::QueryFailed {
            operation: "feed_cache.replace.commit",
            source,
        })?;
        Ok(())
    }
}
