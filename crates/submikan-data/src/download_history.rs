//! Repository for the `download_history` table.
//!
//! Hosts the batched dedup lookup required by `spec.md` §4.4 ("N+1 queries
//! are prohibited") and the insert-if-absent used by the download
//! controller's submit-then-persist ordering (§4.5).

use std::collections::HashSet;

use chrono::Utc;
use sqlx::PgPool;

use crate::error::{DataError, DataResult};
use crate::models::{
    DownloadHistoryRaw, DownloadHistoryRow, DownloadStatus, NewDownloadHistoryRow, ProgressUpdate,
};

/// Repository over the `download_history` table.
#[derive(Clone)]
pub struct DownloadHistoryRepo {
    pool: PgPool,
}

impl DownloadHistoryRepo {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether a row with this hash already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn exists_by_hash(&self, hash: &str) -> DataResult<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM download_history WHERE torrent_hash = $1")
                .bind(hash)
                .fetch_optional(&self.pool)
                .await
                .map_err(|source| DataError::QueryFailed {
                    operation: "exists_by_hash",
                    source,
                })?;
        Ok(row.is_some())
    }

    /// Single-query existence check across many hashes, used by the filter
    /// pipeline's dedup step so it never issues one query per candidate item.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn batch_exists_by_hashes(
        &self,
        hashes: &[String],
    ) -> DataResult<HashSet<String>> {
        if hashes.is_empty() {
            return Ok(HashSet::new());
        }
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT torrent_hash FROM download_history WHERE torrent_hash = ANY($1)",
        )
        .bind(hashes)
        .fetch_all(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "batch_exists_by_hashes",
            source,
        })?;
        Ok(rows.into_iter().map(|(hash,)| hash).collect())
    }

    /// Insert a new row if its hash is not already present; if a concurrent
    /// insert won the race, return the existing row instead (`spec.md` §4.5
    /// idempotency requirement).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn insert_if_absent(
        &self,
        row: NewDownloadHistoryRow,
    ) -> DataResult<DownloadHistoryRow> {
        let downloaded_at = matches!(
            row.status,
            DownloadStatus::Pending | DownloadStatus::Downloading | DownloadStatus::Completed
        )
        .then(Utc::now);

        let inserted = sqlx::query_as::<_, DownloadHistoryRaw>(
            r"
            INSERT INTO download_history (
                subscription_id, torrent_url, torrent_hash, title, file_size,
                status, source, anime_bangumi_id, anime_mikan_bangumi_id, anime_title,
                save_path, category, published_at, downloaded_at, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (torrent_hash) DO NOTHING
            RETURNING *
            ",
        )
        .bind(row.subscription_id)
        .bind(&row.torrent_url)
        .bind(&row.torrent_hash)
        .bind(&row.title)
        .bind(row.file_size)
        .bind(row.status.as_str())
        .bind(row.source.as_str())
        .bind(row.anime_bangumi_id)
        .bind(&row.anime_mikan_bangumi_id)
        .bind(&row.anime_title)
        .bind(&row.save_path)
        .bind(&row.category)
        .bind(row.published_at)
        .bind(downloaded_at)
        .bind(&row.error_message)
        .fetch_optional(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "insert_if_absent",
            source,
        })?;

        match inserted {
            Some(raw) => Ok(raw.into_row()),
            None => self
                .find_by_hash(&row.torrent_hash)
                .await?
                .ok_or_else(|| DataError::NotFound {
                    entity: "download_history",
                    id: row.torrent_hash.clone(),
                }),
        }
    }

    /// Fetch a row by its normalized hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_hash(&self, hash: &str) -> DataResult<Option<DownloadHistoryRow>> {
        let raw = sqlx::query_as::<_, DownloadHistoryRaw>(
            "SELECT * FROM download_history WHERE torrent_hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "find_by_hash",
            source,
        })?;
        Ok(raw.map(DownloadHistoryRaw::into_row))
    }

    /// Batch-load full rows for a set of hashes in one query, used by the
    /// progress reconciler so a `ListTorrents` response never triggers one
    /// lookup per torrent.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_by_hashes(&self, hashes: &[String]) -> DataResult<Vec<DownloadHistoryRow>> {
        if hashes.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, DownloadHistoryRaw>(
            "SELECT * FROM download_history WHERE torrent_hash = ANY($1)",
        )
        .bind(hashes)
        .fetch_all(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "list_by_hashes",
            source,
        })?;
        Ok(rows.into_iter().map(DownloadHistoryRaw::into_row).collect())
    }

    /// List history rows for a subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_by_subscription(
        &self,
        subscription_id: i64,
    ) -> DataResult<Vec<DownloadHistoryRow>> {
        let rows = sqlx::query_as::<_, DownloadHistoryRaw>(
            "SELECT * FROM download_history WHERE subscription_id = $1 ORDER BY discovered_at DESC",
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "list_by_subscription",
            source,
        })?;
        Ok(rows.into_iter().map(DownloadHistoryRaw::into_row).collect())
    }

    /// List history rows attributed to a manual-download anime id (display
    /// fallback fields, not a foreign key).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_by_anime_bangumi_id(
        &self,
        anime_bangumi_id: i64,
    ) -> DataResult<Vec<DownloadHistoryRow>> {
        let rows = sqlx::query_as::<_, DownloadHistoryRaw>(
            "SELECT * FROM download_history WHERE anime_bangumi_id = $1 ORDER BY discovered_at DESC",
        )
        .bind(anime_bangumi_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "list_by_anime_bangumi_id",
            source,
        })?;
        Ok(rows.into_iter().map(DownloadHistoryRaw::into_row).collect())
    }

    /// Apply a batch of realtime-field updates in one transaction, as the
    /// progress reconciler does once per sync pass (`spec.md` §4.7 step 4).
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; no partial update is left
    /// committed.
    pub async fn update_progress_batch(&self, changes: &[ProgressUpdate]) -> DataResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(|source| DataError::QueryFailed {
            operation: "update_progress_batch.begin",
            source,
        })?;

        let now = Utc::now();
        for change in changes {
            let completed_progress = if change.status == DownloadStatus::Completed {
                100.0
            } else {
                change.progress
            };
            sqlx::query(
                r"
                UPDATE download_history SET
                    status = $2, progress = $3, download_speed = $4, eta = $5,
                    num_seeds = $6, num_leechers = $7, error_message = $8,
                    last_synced_at = $9
                WHERE torrent_hash = $1
                ",
            )
            .bind(&change.torrent_hash)
            .bind(change.status.as_str())
            .bind(completed_progress)
            .bind(change.download_speed)
            .bind(change.eta)
            .bind(change.num_seeds)
            .bind(change.num_leechers)
            .bind(&change.error_message)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "update_progress_batch.update",
                source,
            })?;
        }

        tx.commit().await.map_err(|source| DataError::QueryFailed {
            operation: "update_progress_batch.commit",
            source,
        })?;
        Ok(())
    }

    /// Transition a single row's status, e.g. user-driven retry
    /// (`Failed` → `Pending`).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn set_status(&self, hash: &str, status: DownloadStatus) -> DataResult<()> {
        sqlx::query("UPDATE download_history SET status = $2 WHERE torrent_hash = $1")
            .bind(hash)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "set_status",
                source,
            })?;
        Ok(())
    }

    /// Delete a row by hash (user-driven removal via the torrent-client
    /// adapter's `Delete` operation).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn delete_by_hash(&self, hash: &str) -> DataResult<()> {
        sqlx::query("DELETE FROM download_history WHERE torrent_hash = $1")
            .bind(hash)
            .execute(&self.pool)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "delete_by_hash",
                source,
            })?;
        Ok(())
    }
}
