//! Per-subscription feed check (`spec.md` §4.1 steps 3-4, §4.2-§4.5).
//!
//! One call to [`check_subscription`] performs the whole sequence the
//! scheduler fans out per tick: fetch the upstream feed, refresh the
//! subgroup-mapping and feed-cache tables, run the filter pipeline against a
//! single batched dedup query, and submit every accepted item.

use std::collections::HashMap;

use chrono::Utc;
use submikan_data::models::{
    FeedCacheHeader, FeedCacheItem, Subscription, SubgroupMappingEntry,
};
use submikan_feed::FeedItem;
use submikan_filter::{FilterDecision, FilterSettings};
use tracing::{debug, error, warn};

use crate::context::AppContext;
use crate::download_controller;

/// Outcome of one subscription's check, broadcast to observers via
/// [`crate::scheduler::SchedulerHandle::subscribe_results`].
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Subscription this result is for.
    pub subscription_id: i64,
    /// Number of items submitted to the torrent client this check.
    pub submitted: i64,
    /// Set when the check could not complete, e.g. the feed fetch failed.
    pub error: Option<String>,
}

/// Run one full check of `subscription` against the upstream feed.
///
/// Always advances `last_checked_at`, even when nothing is submitted, so the
/// fair-selection query in `spec.md` §4.1 never starves a subscription that
/// simply has nothing new.
pub async fn check_subscription(ctx: &AppContext, subscription: &Subscription) -> CheckResult {
    let known_episode_count = ctx
        .gateway
        .feed_cache
        .get_header(&subscription.mikan_bangumi_id)
        .await
        .ok()
        .flatten()
        .and_then(|header| header.latest_episode);

    let response = match ctx
        .feed
        .fetch_feed(
            &subscription.mikan_bangumi_id,
            subscription.subgroup_id.as_deref(),
            known_episode_count,
        )
        .await
    {
        Ok(response) => {
            ctx.metrics.inc_feed_fetch("ok");
            response
        }
        Err(err) => {
            ctx.metrics.inc_feed_fetch(feed_error_label(&err));
            ctx.metrics.inc_subscription_polled("error");
            warn!(subscription_id = subscription.id, error = %err, "feed fetch failed");
            advance_check_timestamp(ctx, subscription.id).await;
            return CheckResult {
                subscription_id: subscription.id,
                submitted: 0,
                error: Some(err.to_string()),
            };
        }
    };

    sync_subgroup_mapping(ctx, subscription).await;
    persist_feed_cache(ctx, subscription, &response).await;

    let hashes: Vec<String> = response
        .items
        .iter()
        .filter_map(|item| item.torrent_hash.clone())
        .collect();
    let existing_hashes = match ctx.gateway.download_history.batch_exists_by_hashes(&hashes).await {
        Ok(hashes) => hashes,
        Err(err) => {
            ctx.metrics.inc_subscription_polled("error");
            error!(subscription_id = subscription.id, error = %err, "dedup query failed");
            advance_check_timestamp(ctx, subscription.id).await;
            return CheckResult {
                subscription_id: subscription.id,
                submitted: 0,
                error: Some(err.to_string()),
            };
        }
    };

    let name_to_id = subgroup_name_to_id(ctx, subscription).await;

    let settings = FilterSettings {
        subgroup_id: subscription.subgroup_id.clone(),
        keyword_include: subscription.keyword_include.clone(),
        keyword_exclude: subscription.keyword_exclude.clone(),
    };

    let outcomes = submikan_filter::run(response.items, &settings, &existing_hashes, &name_to_id);
    for outcome in &outcomes {
        ctx.metrics.inc_filter_decision(outcome.decision.as_str());
    }

    let mut accepted: Vec<FeedItem> = outcomes
        .into_iter()
        .filter(|outcome| outcome.decision == FilterDecision::Accept)
        .map(|outcome| outcome.item)
        .collect();
    accepted.sort_by_key(|item| item.published_at);

    let mut submitted = 0i64;
    for item in &accepted {
        if download_controller::submit_subscription_item(ctx, subscription, item)
            .await
            .is_some()
        {
            submitted += 1;
            let now = Utc::now();
            if let Err(err) = ctx
                .gateway
                .subscriptions
                .update_check_timestamps(subscription.id, now, Some(now), true)
                .await
            {
                warn!(subscription_id = subscription.id, error = %err, "failed to advance check timestamps after submission");
            }
        }
    }

    if submitted == 0 {
        advance_check_timestamp(ctx, subscription.id).await;
    }

    ctx.metrics.inc_subscription_polled("ok");
    CheckResult {
        subscription_id: subscription.id,
        submitted,
        error: None,
    }
}

/// Advance `last_checked_at` with no download recorded, so a check that
/// submitted nothing (including one that failed before reaching the filter
/// pipeline) never sits at the front of the fair-selection query forever.
async fn advance_check_timestamp(ctx: &AppContext, subscription_id: i64) {
    let now = Utc::now();
    if let Err(err) = ctx
        .gateway
        .subscriptions
        .update_check_timestamps(subscription_id, now, None, false)
        .await
    {
        warn!(subscription_id, error = %err, "failed to advance check timestamp");
    }
}

async fn sync_subgroup_mapping(ctx: &AppContext, subscription: &Subscription) {
    let (entries, fetch_succeeded) = match ctx.feed.list_subgroups(&subscription.mikan_bangumi_id).await {
        Ok(listing) => (
            listing
                .into_iter()
                .map(|entry| SubgroupMappingEntry {
                    mikan_bangumi_id: subscription.mikan_bangumi_id.clone(),
                    subgroup_id: entry.subgroup_id,
                    subgroup_name: entry.subgroup_name,
                })
                .collect::<Vec<_>>(),
            true,
        ),
        Err(err) => {
            debug!(subscription_id = subscription.id, error = %err, "subgroup listing fetch failed, leaving cached mapping untouched");
            (Vec::new(), false)
        }
    };

    if let Err(err) = ctx
        .gateway
        .subgroup_mapping
        .sync(&subscription.mikan_bangumi_id, &entries, fetch_succeeded)
        .await
    {
        warn!(subscription_id = subscription.id, error = %err, "failed to sync subgroup mapping cache");
    }
}

async fn subgroup_name_to_id(ctx: &AppContext, subscription: &Subscription) -> HashMap<String, String> {
    ctx.gateway
        .subgroup_mapping
        .list(&subscription.mikan_bangumi_id)
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|row| (row.subgroup_name, row.subgroup_id))
        .collect()
}

async fn persist_feed_cache(
    ctx: &AppContext,
    subscription: &Subscription,
    response: &submikan_feed::FeedResponse,
) {
    let header = FeedCacheHeader {
        mikan_bangumi_id: subscription.mikan_bangumi_id.clone(),
        season_name: response.season_name.clone(),
        latest_episode: response.latest_episode,
        latest_published_at: response.latest_published_at,
        latest_title: response.latest_title.clone(),
        episode_offset: response.episode_offset,
        updated_at: Utc::now(),
    };
    let cache_items: Vec<FeedCacheItem> = response
        .items
        .iter()
        .map(|item| FeedCacheItem {
            title: item.title.clone(),
            torrent_url: item.torrent_url.clone(),
            magnet_link: item.magnet_link.clone(),
            torrent_hash: item.torrent_hash.clone(),
            can_download: item.can_download,
            file_size: item.file_size,
            formatted_size: None,
            published_at: item.published_at,
            resolution: item.resolution.clone(),
            subgroup: item.subgroup.clone(),
            subtitle_type: item.subtitle_type.clone(),
            episode: item.episode,
            is_collection: item.is_collection,
        })
        .collect();

    if let Err(err) = ctx.gateway.feed_cache.replace(&header, &cache_items).await {
        warn!(subscription_id = subscription.id, error = %err, "failed to persist feed cache refresh");
    }
}

fn feed_error_label(err: &submikan_feed::FeedError) -> &'static str {
    use submikan_feed::FeedError;
    match err {
        FeedError::Timeout => "timeout",
        FeedError::HttpStatus(_) => "http_error",
        FeedError::NetworkError(_) => "network_error",
        FeedError::Cancelled => "cancelled",
        FeedError::ParseError(_) => "parse_error",
    }
}
