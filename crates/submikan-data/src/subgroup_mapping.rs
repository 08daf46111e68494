//! Repository for the `subgroup_mapping` table.
//!
//! Full-sync semantics (`spec.md` §3, §4.8): a successful scrape with zero
//! rows clears the mapping; a failed fetch leaves it untouched. The
//! distinction is carried explicitly by the caller as `fetch_succeeded`
//! rather than inferred from an empty `current_rows` slice.

use sqlx::PgPool;

use crate::error::{DataError, DataResult};
use crate::models::SubgroupMappingEntry;

/// Repository over the `subgroup_mapping` table.
#[derive(Clone)]
pub struct SubgroupMappingRepo {
    pool: PgPool,
}

impl SubgroupMappingRepo {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List the currently cached subgroup mapping for an upstream feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self, mikan_id: &str) -> DataResult<Vec<SubgroupMappingEntry>> {
        sqlx::query_as::<_, SubgroupMappingEntry>(
            "SELECT mikan_bangumi_id, subgroup_id, subgroup_name FROM subgroup_mapping \
             WHERE mikan_bangumi_id = $1",
        )
        .bind(mikan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "subgroup_mapping.list",
            source,
        })
    }

    /// Synchronize the cached mapping with the latest scrape outcome.
    ///
    /// When `fetch_succeeded` is `true`, upserts every row in
    /// `current_rows` and deletes any cached row absent from it (including
    /// clearing the whole set when `current_rows` is empty). When
    /// `fetch_succeeded` is `false`, the cache is left untouched regardless
    /// of `current_rows`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails; no partial sync is left
    /// committed.
    pub async fn sync(
        &self,
        mikan_id: &str,
        current_rows: &[SubgroupMappingEntry],
        fetch_succeeded: bool,
    ) -> DataResult<()> {
        if !fetch_succeeded {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(|source| DataError::QueryFailed {
            operation: "subgroup_mapping.sync.begin",
            source,
        })?;

        let keep_ids: Vec<String> = current_rows.iter().map(|row| row.subgroup_id.clone()).collect();

        sqlx::query(
            "DELETE FROM subgroup_mapping WHERE mikan_bangumi_id = $1 AND NOT (subgroup_id = ANY($2))",
        )
        .bind(mikan_id)
        .bind(&keep_ids)
        .execute(&mut *tx)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "subgroup_mapping.sync.delete_stale",
            source,
        })?;

        for row in current_rows {
            sqlx::query(
                r"
                INSERT INTO subgroup_mapping (mikan_bangumi_id, subgroup_id, subgroup_name, updated_at)
                VALUES ($1, $2, $3, now())
                ON CONFLICT (mikan_bangumi_id, subgroup_id)
                DO UPDATE SET subgroup_name = EXCLUDED.subgroup_name, updated_at = now()
                ",
            )
            .bind(mikan_id)
            .bind(&row.subgroup_id)
            .bind(&row.subgroup_name)
            .execute(&mut *tx)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "subgroup_mapping.sync.upsert",
                source,
            })?;
        }

        tx.commit().await.map_err(|source| DataError::QueryFailed {
            operation: "subgroup_mapping.sync.commit",
            source,
        })?;
        Ok(())
    }
}
