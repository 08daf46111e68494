//! Repository for the `subscriptions` table.
//!
//! Hosts the fair-selection query (`spec.md` §4.1) and the idempotent
//! `ensure_subscription` upsert relied on by §8's round-trip law.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{DataError, DataResult};
use crate::models::{MANUAL_SENTINEL_BANGUMI_ID, MANUAL_SENTINEL_TITLE, Subscription};

/// Repository over the `subscriptions` table.
#[derive(Clone)]
pub struct SubscriptionRepo {
    pool: PgPool,
}

impl SubscriptionRepo {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fair-selection query for the scheduler: enabled, non-sentinel
    /// subscriptions ordered by `last_checked_at` ascending (nulls first),
    /// then `id` ascending, capped at `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_enabled_for_poll(&self, limit: i64) -> DataResult<Vec<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            r"
            SELECT * FROM subscriptions
            WHERE is_enabled AND bangumi_id > 0
            ORDER BY last_checked_at ASC NULLS FIRST, id ASC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "list_enabled_for_poll",
            source,
        })
    }

    /// List every subscription, including the manual-download sentinel,
    /// ordered by `id` for stable pagination-free listing (`spec.md` §6
    /// "List ... subscription").
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_all(&self) -> DataResult<Vec<Subscription>> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "list_all",
                source,
            })
    }

    /// Fetch a subscription by primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_by_id(&self, id: i64) -> DataResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "get_by_id",
                source,
            })
    }

    /// Fetch a subscription by its external anime identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn get_by_bangumi_id(&self, bangumi_id: i64) -> DataResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE bangumi_id = $1")
            .bind(bangumi_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "get_by_bangumi_id",
                source,
            })
    }

    /// Return the manual-download sentinel subscription, creating it if it
    /// does not yet exist (the init migration seeds it, so this is normally
    /// a no-op lookup).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn ensure_manual_sentinel(&self) -> DataResult<Subscription> {
        if let Some(existing) = self
            .get_by_bangumi_id(MANUAL_SENTINEL_BANGUMI_ID)
            .await?
        {
            return Ok(existing);
        }

        sqlx::query_as::<_, Subscription>(
            r"
            INSERT INTO subscriptions (bangumi_id, title, mikan_bangumi_id, is_enabled)
            VALUES ($1, $2, '', FALSE)
            ON CONFLICT (bangumi_id) WHERE bangumi_id > 0 DO UPDATE SET title = EXCLUDED.title
            RETURNING *
            ",
        )
        .bind(MANUAL_SENTINEL_BANGUMI_ID)
        .bind(MANUAL_SENTINEL_TITLE)
        .fetch_one(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "ensure_manual_sentinel",
            source,
        })
    }

    /// Idempotent upsert keyed by `bangumi_id`. Calling this twice with the
    /// same arguments returns the same row and performs no duplicate insert
    /// (`spec.md` §8).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn ensure_subscription(
        &self,
        bangumi_id: i64,
        title: &str,
        mikan_bangumi_id: &str,
    ) -> DataResult<Subscription> {
        sqlx::query_as::<_, Subscription>(
            r"
            INSERT INTO subscriptions (bangumi_id, title, mikan_bangumi_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (bangumi_id) WHERE bangumi_id > 0
            DO UPDATE SET title = EXCLUDED.title, mikan_bangumi_id = EXCLUDED.mikan_bangumi_id, updated_at = now()
            RETURNING *
            ",
        )
        .bind(bangumi_id)
        .bind(title)
        .bind(mikan_bangumi_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "ensure_subscription",
            source,
        })
    }

    /// Insert or fully replace a subscription's editable fields (used by the
    /// user-facing create/update surface).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        id: Option<i64>,
        bangumi_id: i64,
        title: &str,
        mikan_bangumi_id: &str,
        subgroup_id: Option<&str>,
        subgroup_name: Option<&str>,
        keyword_include: &str,
        keyword_exclude: &str,
        is_enabled: bool,
    ) -> DataResult<Subscription> {
        match id {
            Some(id) => sqlx::query_as::<_, Subscription>(
                r"
                UPDATE subscriptions SET
                    bangumi_id = $2, title = $3, mikan_bangumi_id = $4,
                    subgroup_id = $5, subgroup_name = $6,
                    keyword_include = $7, keyword_exclude = $8, is_enabled = $9,
                    updated_at = now()
                WHERE id = $1
                RETURNING *
                ",
            )
            .bind(id)
            .bind(bangumi_id)
            .bind(title)
            .bind(mikan_bangumi_id)
            .bind(subgroup_id)
            .bind(subgroup_name)
            .bind(keyword_include)
            .bind(keyword_exclude)
            .bind(is_enabled)
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "upsert_update",
                source,
            })?
            .ok_or_else(|| DataError::NotFound {
                entity: "subscription",
                id: id.to_string(),
            }),
            None => sqlx::query_as::<_, Subscription>(
                r"
                INSERT INTO subscriptions (
                    bangumi_id, title, mikan_bangumi_id, subgroup_id, subgroup_name,
                    keyword_include, keyword_exclude, is_enabled
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
                ",
            )
            .bind(bangumi_id)
            .bind(title)
            .bind(mikan_bangumi_id)
            .bind(subgroup_id)
            .bind(subgroup_name)
            .bind(keyword_include)
            .bind(keyword_exclude)
            .bind(is_enabled)
            .fetch_one(&self.pool)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "upsert_insert",
                source,
            }),
        }
    }

    /// Update `last_checked_at` (always) and optionally `last_download_at`
    /// and `download_count` in one statement, per the controller's
    /// per-task completion contract in `spec.md` §4.1.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn update_check_timestamps(
        &self,
        id: i64,
        checked_at: DateTime<Utc>,
        download_at: Option<DateTime<Utc>>,
        increment_count: bool,
    ) -> DataResult<()> {
        sqlx::query(
            r"
            UPDATE subscriptions SET
                last_checked_at = $2,
                last_download_at = COALESCE($3, last_download_at),
                download_count = download_count + CASE WHEN $4 THEN 1 ELSE 0 END,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(checked_at)
        .bind(download_at)
        .bind(increment_count)
        .execute(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "update_check_timestamps",
            source,
        })?;
        Ok(())
    }

    /// Delete a subscription. History rows referencing it survive, per
    /// `spec.md` §3.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn delete(&self, id: i64) -> DataResult<()> {
        sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "delete_subscription",
                source,
            })?;
        Ok(())
    }
}
