//! The API surface named but not specified in `spec.md` §6: plain async
//! functions a future HTTP layer calls directly. This module owns no
//! transport or auth concerns, only the business logic the core already has
//! everything it needs to run.

use submikan_data::models::{DownloadHistoryRow, Subscription};
use submikan_feed::SubgroupListing;
use tracing::info;

use crate::context::AppContext;
use crate::download_controller;
use crate::error::{AppError, AppResult};
use crate::pipeline;

/// List every subscription, including the manual-download sentinel.
///
/// # Errors
///
/// Propagates a persistence failure.
pub async fn list_subscriptions(ctx: &AppContext) -> AppResult<Vec<Subscription>> {
    Ok(ctx.gateway.subscriptions.list_all().await?)
}

/// Fetch one subscription by id.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if no subscription has that id, or
/// propagates a persistence failure.
pub async fn get_subscription(ctx: &AppContext, id: i64) -> AppResult<Subscription> {
    ctx.gateway
        .subscriptions
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            entity: "subscription",
            id: id.to_string(),
        })
}

/// Fields accepted by [`create_subscription`] and [`update_subscription`].
#[derive(Debug, Clone)]
pub struct SubscriptionFields {
    /// External anime identifier.
    pub bangumi_id: i64,
    /// Display title.
    pub title: String,
    /// Upstream RSS feed identifier.
    pub mikan_bangumi_id: String,
    /// Server-side subgroup filter, by id.
    pub subgroup_id: Option<String>,
    /// Server-side subgroup filter, by display name.
    pub subgroup_name: Option<String>,
    /// Comma/whitespace-separated include tokens.
    pub keyword_include: String,
    /// Comma/whitespace-separated exclude tokens.
    pub keyword_exclude: String,
    /// Whether the scheduler should consider this subscription.
    pub is_enabled: bool,
}

/// Create a new subscription row.
///
/// # Errors
///
/// Propagates a persistence failure, including a unique-constraint
/// violation on `bangumi_id` (surfaced as `Conflict` per `spec.md` §7 by the
/// caller's persistence-error mapping).
pub async fn create_subscription(
    ctx: &AppContext,
    fields: SubscriptionFields,
) -> AppResult<Subscription> {
    Ok(ctx
        .gateway
        .subscriptions
        .upsert(
            None,
            fields.bangumi_id,
            &fields.title,
            &fields.mikan_bangumi_id,
            fields.subgroup_id.as_deref(),
            fields.subgroup_name.as_deref(),
            &fields.keyword_include,
            &fields.keyword_exclude,
            fields.is_enabled,
        )
        .await?)
}

/// Update an existing subscription's editable fields.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if `id` does not exist, or propagates a
/// persistence failure.
pub async fn update_subscription(
    ctx: &AppContext,
    id: i64,
    fields: SubscriptionFields,
) -> AppResult<Subscription> {
    Ok(ctx
        .gateway
        .subscriptions
        .upsert(
            Some(id),
            fields.bangumi_id,
            &fields.title,
            &fields.mikan_bangumi_id,
            fields.subgroup_id.as_deref(),
            fields.subgroup_name.as_deref(),
            &fields.keyword_include,
            &fields.keyword_exclude,
            fields.is_enabled,
        )
        .await?)
}

/// Idempotent upsert keyed by `bangumi_id` (`spec.md` §6, §8's round-trip
/// law): calling this twice with identical arguments returns the same row
/// and performs no duplicate insert.
///
/// # Errors
///
/// Propagates a persistence failure.
pub async fn ensure_subscription(
    ctx: &AppContext,
    bangumi_id: i64,
    title: &str,
    mikan_bangumi_id: &str,
) -> AppResult<Subscription> {
    Ok(ctx
        .gateway
        .subscriptions
        .ensure_subscription(bangumi_id, title, mikan_bangumi_id)
        .await?)
}

/// Delete a subscription, optionally deleting its not-yet-terminal
/// downloads from the torrent client first (`spec.md` §6 "Cancel
/// subscription with optional deletion of downloaded files").
///
/// History rows survive the subscription delete per `spec.md` §3 regardless
/// of `delete_files`; only the torrent client's copy is removed.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if `id` does not exist, or propagates a
/// persistence/torrent-client failure.
pub async fn cancel_subscription(ctx: &AppContext, id: i64, delete_files: bool) -> AppResult<()> {
    get_subscription(ctx, id).await?;

    if delete_files {
        for row in ctx.gateway.download_history.list_by_subscription(id).await? {
            if matches!(
                row.status,
                submikan_data::models::DownloadStatus::Completed
                    | submikan_data::models::DownloadStatus::Failed
            ) {
                continue;
            }
            if let Err(err) = ctx.torrent.delete(&row.torrent_hash, true).await {
                tracing::warn!(subscription_id = id, hash = %row.torrent_hash, error = %err, "failed to delete torrent during subscription cancellation");
            }
        }
    }

    ctx.gateway.subscriptions.delete(id).await?;
    Ok(())
}

/// Outcome of [`trigger_check`].
#[derive(Debug, Clone)]
pub struct TriggerCheckOutcome {
    /// Number of subscriptions checked.
    pub checked: usize,
    /// Total items submitted across every checked subscription.
    pub submitted: i64,
}

/// Immediately check one subscription, bypassing the scheduler's tick
/// cadence (`spec.md` §4.1 `KickSubscription`, §6 "Trigger check").
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if `id` does not exist.
pub async fn trigger_check(ctx: &AppContext, id: i64) -> AppResult<TriggerCheckOutcome> {
    let subscription = get_subscription(ctx, id).await?;
    let result = pipeline::check_subscription(ctx, &subscription).await;
    if let Some(error) = result.error {
        info!(subscription_id = id, error, "triggered check completed with an error");
    }
    Ok(TriggerCheckOutcome {
        checked: 1,
        submitted: result.submitted,
    })
}

/// Immediately check every enabled subscription, bypassing the normal fair
/// selection cap (`spec.md` §6 "Trigger check ... or all").
///
/// # Errors
///
/// Propagates a persistence failure when loading the subscription list.
pub async fn trigger_check_all(ctx: &AppContext) -> AppResult<TriggerCheckOutcome> {
    let subscriptions = ctx
        .gateway
        .subscriptions
        .list_enabled_for_poll(i64::MAX)
        .await?;
    let mut submitted = 0i64;
    let checked = subscriptions.len();
    for subscription in &subscriptions {
        submitted += pipeline::check_subscription(ctx, subscription).await.submitted;
    }
    Ok(TriggerCheckOutcome { checked, submitted })
}

/// Query download history for one subscription.
///
/// # Errors
///
/// Propagates a persistence failure.
pub async fn history_for_subscription(
    ctx: &AppContext,
    subscription_id: i64,
) -> AppResult<Vec<DownloadHistoryRow>> {
    Ok(ctx
        .gateway
        .download_history
        .list_by_subscription(subscription_id)
        .await?)
}

/// Query download history by the manual-download anime identifier
/// (`spec.md` §6 "Query download history ... by manual-anime `bangumi_id`").
///
/// # Errors
///
/// Propagates a persistence failure.
pub async fn history_for_manual_anime(
    ctx: &AppContext,
    anime_bangumi_id: i64,
) -> AppResult<Vec<DownloadHistoryRow>> {
    Ok(ctx
        .gateway
        .download_history
        .list_by_anime_bangumi_id(anime_bangumi_id)
        .await?)
}

/// Search the upstream indexing site by free-text title.
///
/// # Errors
///
/// Propagates a feed-fetcher failure (network, timeout, HTTP status).
pub async fn search_anime(ctx: &AppContext, title: &str) -> AppResult<Vec<(String, String)>> {
    Ok(ctx.feed.search_anime(title).await?)
}

/// Fetch and parse the feed for one upstream anime id, without persisting
/// it (`spec.md` §6 "fetch parsed feed by `mikan_bangumi_id`").
///
/// # Errors
///
/// Propagates a feed-fetcher failure.
pub async fn fetch_feed(
    ctx: &AppContext,
    mikan_bangumi_id: &str,
) -> AppResult<submikan_feed::FeedResponse> {
    Ok(ctx.feed.fetch_feed(mikan_bangumi_id, None, None).await?)
}

/// List the subgroups known to have released content for an anime.
///
/// # Errors
///
/// Propagates a feed-fetcher failure.
pub async fn list_subgroups(
    ctx: &AppContext,
    mikan_bangumi_id: &str,
) -> AppResult<Vec<SubgroupListing>> {
    Ok(ctx.feed.list_subgroups(mikan_bangumi_id).await?)
}

/// Submit a manually-supplied magnet link or `.torrent` URL (`spec.md`
/// §4.5 manual path, §6 "Submit a manual torrent download").
///
/// # Errors
///
/// Returns [`AppError::Validation`] if no info-hash can be derived, or
/// propagates a torrent-client/persistence failure.
pub async fn submit_manual_download(
    ctx: &AppContext,
    url_or_magnet: &str,
    title: Option<String>,
    save_path: Option<String>,
    category: Option<String>,
) -> AppResult<DownloadHistoryRow> {
    download_controller::submit_manual(ctx, url_or_magnet, title, save_path, category).await
}

/// Pause a torrent by hash.
///
/// # Errors
///
/// Returns [`AppError::Validation`] if `hash` does not normalize, or
/// propagates a torrent-client failure.
pub async fn pause_download(ctx: &AppContext, hash: &str) -> AppResult<bool> {
    Ok(ctx.torrent.pause(hash).await?)
}

/// Resume a paused torrent by hash.
///
/// # Errors
///
/// Propagates a torrent-client failure.
pub async fn resume_download(ctx: &AppContext, hash: &str) -> AppResult<bool> {
    Ok(ctx.torrent.resume(hash).await?)
}

/// Delete a torrent by hash, removing its history row only once the client
/// confirms the delete.
///
/// # Errors
///
/// Propagates a torrent-client or persistence failure.
pub async fn delete_download(ctx: &AppContext, hash: &str, delete_files: bool) -> AppResult<bool> {
    let deleted = ctx.torrent.delete(hash, delete_files).await?;
    if deleted {
        ctx.gateway.download_history.delete_by_hash(hash).await?;
    }
    Ok(deleted)
}

/// One torrent's client-reported state merged with its history row, for a
/// "list torrents with realtime merge" read (`spec.md` §6).
#[derive(Debug, Clone)]
pub struct MergedTorrent {
    /// History row, when this system has recorded the hash.
    pub history: Option<DownloadHistoryRow>,
    /// Live client snapshot.
    pub snapshot: submikan_torrent_core::TorrentSnapshot,
}

/// List every torrent the client knows about, merged with this system's
/// history row when one exists.
///
/// # Errors
///
/// Propagates a torrent-client or persistence failure.
pub async fn list_torrents_merged(
    ctx: &AppContext,
    category: Option<&str>,
) -> AppResult<Vec<MergedTorrent>> {
    let snapshots = ctx.torrent.list_torrents(category).await?;
    let hashes: Vec<String> = snapshots.iter().map(|s| s.hash.clone()).collect();
    let rows = ctx.gateway.download_history.list_by_hashes(&hashes).await?;
    let mut by_hash: std::collections::HashMap<String, DownloadHistoryRow> =
        rows.into_iter().map(|row| (row.torrent_hash.clone(), row)).collect();

    Ok(snapshots
        .into_iter()
        .map(|snapshot| MergedTorrent {
            history: by_hash.remove(&snapshot.hash),
            snapshot,
        })
        .collect())
}
