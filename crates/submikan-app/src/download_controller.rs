//! Submit-then-persist download submission (`spec.md` §4.5).
//!
//! The torrent client is always called before any row is written: a crash
//! between the two steps leaves at worst an orphan torrent in the client,
//! never a history row pointing at a torrent that was never submitted. A
//! transient client failure on the subscription path is logged and silently
//! dropped so the next scheduler tick retries the same item; the manual path
//! has no next tick to rely on, so it propagates the failure instead.

use submikan_data::models::{
    DownloadHistoryRow, DownloadSource, DownloadStatus, NewDownloadHistoryRow, Subscription,
};
use submikan_feed::FeedItem;
use submikan_torrent_core::{AddTorrentRequest, TorrentClient, extract_hash_from_magnet, normalize_info_hash};
use tracing::{error, warn};

use crate::context::AppContext;
use crate::error::{AppError, AppResult};

/// Submit one accepted feed item on behalf of a subscription.
///
/// Returns `None` (after logging) when no hash could be derived, when the
/// torrent client is transiently unavailable, or when persistence fails —
/// none of these should interrupt the rest of the scheduler batch.
pub async fn submit_subscription_item(
    ctx: &AppContext,
    subscription: &Subscription,
    item: &FeedItem,
) -> Option<DownloadHistoryRow> {
    let Some(hash) = resolve_hash(item) else {
        warn!(subscription_id = subscription.id, title = %item.title, "accepted item has no derivable hash, skipping");
        return None;
    };

    let request = AddTorrentRequest {
        url_or_magnet: item.magnet_link.clone().unwrap_or_else(|| item.torrent_url.clone()),
        save_path: Some(ctx.config.torrent_client.default_save_path.clone()),
        category: Some(ctx.config.torrent_client.category.clone()),
        paused: false,
    };

    let (status, error_message) = match ctx.torrent.add_torrent(request).await {
        Ok(()) => {
            ctx.metrics.inc_download_submitted("ok");
            (DownloadStatus::Pending, None)
        }
        Err(err) if err.is_transient() => {
            warn!(subscription_id = subscription.id, hash, error = %err, "torrent client unavailable, will retry next tick");
            ctx.metrics.inc_download_submitted("unavailable");
            return None;
        }
        Err(err) => {
            warn!(subscription_id = subscription.id, hash, error = %err, "torrent client rejected subscription item");
            ctx.metrics.inc_download_submitted("rejected");
            (DownloadStatus::Failed, Some(err.to_string()))
        }
    };

    let row = NewDownloadHistoryRow {
        subscription_id: subscription.id,
        torrent_url: item.torrent_url.clone(),
        torrent_hash: hash,
        title: item.title.clone(),
        file_size: item.file_size,
        status,
        source: DownloadSource::Subscription,
        anime_bangumi_id: Some(subscription.bangumi_id),
        anime_mikan_bangumi_id: Some(subscription.mikan_bangumi_id.clone()),
        anime_title: Some(subscription.title.clone()),
        save_path: Some(ctx.config.torrent_client.default_save_path.clone()),
        category: Some(ctx.config.torrent_client.category.clone()),
        published_at: item.published_at,
        error_message,
    };

    match ctx.gateway.download_history.insert_if_absent(row).await {
        Ok(row) => Some(row),
        Err(err) => {
            error!(subscription_id = subscription.id, error = %err, "failed to persist download history row");
            None
        }
    }
}

/// Submit a manually-supplied magnet link or `.torrent` URL, attributing it
/// to the manual-download sentinel subscription (`spec.md` §4.5 manual path,
/// §8 scenario 4).
///
/// # Errors
///
/// Returns [`AppError::Validation`] if no info-hash can be derived from
/// `url_or_magnet`, or propagates the torrent client's or gateway's error
/// otherwise (including a transient [`AppError::Torrent`], unlike the
/// subscription path).
pub async fn submit_manual(
    ctx: &AppContext,
    url_or_magnet: &str,
    title: Option<String>,
    save_path: Option<String>,
    category: Option<String>,
) -> AppResult<DownloadHistoryRow> {
    let hash = extract_hash_from_magnet(url_or_magnet)
        .or_else(|| normalize_info_hash(url_or_magnet))
        .ok_or_else(|| AppError::Validation {
            reason: "could not derive an info-hash from the given magnet link or URL".to_string(),
        })?;

    let sentinel = ctx.gateway.subscriptions.ensure_manual_sentinel().await?;

    let request = AddTorrentRequest {
        url_or_magnet: url_or_magnet.to_string(),
        save_path: Some(
            save_path
                .clone()
                .unwrap_or_else(|| ctx.config.torrent_client.default_save_path.clone()),
        ),
        category: Some(
            category
                .clone()
                .unwrap_or_else(|| ctx.config.torrent_client.category.clone()),
        ),
        paused: false,
    };

    if let Err(err) = ctx.torrent.add_torrent(request).await {
        ctx.metrics
            .inc_download_submitted(if err.is_transient() { "unavailable" } else { "rejected" });
        return Err(AppError::from(err));
    }
    ctx.metrics.inc_download_submitted("ok");

    let row = NewDownloadHistoryRow {
        subscription_id: sentinel.id,
        torrent_url: url_or_magnet.to_string(),
        torrent_hash: hash,
        title: title.unwrap_or_else(|| url_or_magnet.to_string()),
        file_size: None,
        status: DownloadStatus::Pending,
        source: DownloadSource::Manual,
        anime_bangumi_id: None,
        anime_mikan_bangumi_id: None,
        anime_title: None,
        save_path,
        category,
        published_at: None,
        error_message: None,
    };

    Ok(ctx.gateway.download_history.insert_if_absent(row).await?)
}

fn resolve_hash(item: &FeedItem) -> Option<String> {
    item.torrent_hash.clone().or_else(|| {
        item.magnet_link
            .as_deref()
            .and_then(extract_hash_from_magnet)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(hash: Option<&str>, magnet: Option<&str>) -> FeedItem {
        FeedItem {
            title: "Show - 01".to_string(),
            torrent_url: "https://example.com/01.torrent".to_string(),
            magnet_link: magnet.map(str::to_string),
            torrent_hash: hash.map(str::to_string),
            can_download: true,
            file_size: None,
            published_at: None,
            resolution: None,
            subgroup: None,
            subtitle_type: None,
            episode: Some(1),
            is_collection: false,
        }
    }

    #[test]
    fn resolve_hash_prefers_stored_hash() {
        let stored = "A".repeat(40);
        let resolved = resolve_hash(&item(Some(&stored), None));
        assert_eq!(resolved, Some(stored));
    }

    #[test]
    fn resolve_hash_falls_back_to_magnet() {
        let magnet = "magnet:?xt=urn:btih:ABCDEF0123456789ABCDEF0123456789ABCDEF01";
        let resolved = resolve_hash(&item(None, Some(magnet)));
        assert_eq!(
            resolved,
            Some("ABCDEF0123456789ABCDEF0123456789ABCDEF01".to_string())
        );
    }

    #[test]
    fn resolve_hash_none_when_undownloadable() {
        assert_eq!(resolve_hash(&item(None, None)), None);
    }
}
