//! Row types for the subscription/history/feed-cache/subgroup-mapping tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Reserved title of the sentinel subscription used to attribute manual
/// downloads. See `spec.md` §3 invariant (ii).
pub const MANUAL_SENTINEL_TITLE: &str = "__manual_download_tracking__";

/// `bangumi_id` used by the manual-download sentinel subscription.
pub const MANUAL_SENTINEL_BANGUMI_ID: i64 = -1;

/// A user's interest in one anime release track.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    /// Primary key.
    pub id: i64,
    /// External anime identifier. `-1` marks the manual-download sentinel.
    pub bangumi_id: i64,
    /// Display title.
    pub title: String,
    /// Upstream RSS feed identifier.
    pub mikan_bangumi_id: String,
    /// Server-side subgroup filter, by id.
    pub subgroup_id: Option<String>,
    /// Server-side subgroup filter, by display name.
    pub subgroup_name: Option<String>,
    /// Comma/whitespace-separated tokens that must all appear in a title.
    pub keyword_include: String,
    /// Comma/whitespace-separated tokens that must not appear in a title.
    pub keyword_exclude: String,
    /// Whether the scheduler considers this subscription for polling.
    pub is_enabled: bool,
    /// Timestamp of the most recent scheduler check, if any.
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Timestamp of the most recent successful submission, if any.
    pub last_download_at: Option<DateTime<Utc>>,
    /// Running count of torrents submitted for this subscription.
    pub download_count: i64,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Row last-update time.
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether this row is the manual-download sentinel.
    #[must_use]
    pub fn is_manual_sentinel(&self) -> bool {
        self.title == MANUAL_SENTINEL_TITLE && self.bangumi_id == MANUAL_SENTINEL_BANGUMI_ID
    }
}

/// Lifecycle state of a [`DownloadHistoryRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Accepted by the torrent client but not yet reported as active.
    Pending,
    /// The torrent client reports active transfer.
    Downloading,
    /// The torrent client reports the transfer finished.
    Completed,
    /// Submission or transfer failed permanently.
    Failed,
    /// Filtered out by user choice; never submitted.
    Skipped,
}

impl DownloadStatus {
    /// Stable lowercase label stored in the `status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Parse a stored label back into a [`DownloadStatus`].
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(Self::Pending),
            "downloading" => Some(Self::Downloading),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// Origin of a [`DownloadHistoryRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadSource {
    /// Submitted through the manual-download API path.
    Manual,
    /// Submitted by the scheduler on behalf of a subscription.
    Subscription,
}

impl DownloadSource {
    /// Stable lowercase label stored in the `source` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Subscription => "subscription",
        }
    }

    /// Parse a stored label back into a [`DownloadSource`].
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "manual" => Some(Self::Manual),
            "subscription" => Some(Self::Subscription),
            _ => None,
        }
    }
}

/// One record per torrent hash the system has ever observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadHistoryRow {
    /// Primary key.
    pub id: i64,
    /// Owning subscription (the manual sentinel for manual submissions), or
    /// `None` once the owning subscription has been deleted — the row
    /// survives per `spec.md` §3.
    pub subscription_id: Option<i64>,
    /// Enclosure URL or direct `.torrent`/magnet URL.
    pub torrent_url: String,
    /// Normalized 40-character uppercase hex info-hash.
    pub torrent_hash: String,
    /// Display title.
    pub title: String,
    /// Size in bytes, if known.
    pub file_size: Option<i64>,
    /// Lifecycle state.
    pub status: DownloadStatus,
    /// Submission origin.
    pub source: DownloadSource,
    /// Display fallback: external anime id.
    pub anime_bangumi_id: Option<i64>,
    /// Display fallback: upstream feed id.
    pub anime_mikan_bangumi_id: Option<String>,
    /// Display fallback: anime title.
    pub anime_title: Option<String>,
    /// Completion fraction, `0.0..=100.0`.
    pub progress: f64,
    /// Download speed in bytes/sec, as last observed.
    pub download_speed: i64,
    /// Estimated seconds remaining, as last observed.
    pub eta: Option<i64>,
    /// Connected seed count, as last observed.
    pub num_seeds: i32,
    /// Connected leecher count, as last observed.
    pub num_leechers: i32,
    /// Filesystem path the torrent is saving into.
    pub save_path: Option<String>,
    /// Category label assigned in the torrent client.
    pub category: Option<String>,
    /// RSS item publish time.
    pub published_at: Option<DateTime<Utc>>,
    /// When this system first observed the item.
    pub discovered_at: DateTime<Utc>,
    /// When the item was first submitted to the torrent client.
    pub downloaded_at: Option<DateTime<Utc>>,
    /// When the reconciler last wrote realtime fields for this row.
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Error detail for `Failed` rows.
    pub error_message: Option<String>,
}

#[derive(Debug, FromRow)]
pub(crate) struct DownloadHistoryRaw {
    pub id: i64,
    pub subscription_id: Option<i64>,
    pub torrent_url: String,
    pub torrent_hash: String,
    pub title: String,
    pub file_size: Option<i64>,
    pub status: String,
    pub source: String,
    pub anime_bangumi_id: Option<i64>,
    pub anime_mikan_bangumi_id: Option<String>,
    pub anime_title: Option<String>,
    pub progress: f64,
    pub download_speed: i64,
    pub eta: Option<i64>,
    pub num_seeds: i32,
    pub num_leechers: i32,
    pub save_path: Option<String>,
    pub category: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub discovered_at: DateTime<Utc>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl DownloadHistoryRaw {
    pub(crate) fn into_row(self) -> DownloadHistoryRow {
        DownloadHistoryRow {
            id: self.id,
            subscription_id: self.subscription_id,
            torrent_url: self.torrent_url,
            torrent_hash: self.torrent_hash,
            title: self.title,
            file_size: self.file_size,
            status: DownloadStatus::parse(&self.status).unwrap_or(DownloadStatus::Failed),
            source: DownloadSource::parse(&self.source).unwrap_or(DownloadSource::Manual),
            anime_bangumi_id: self.anime_bangumi_id,
            anime_mikan_bangumi_id: self.anime_mikan_bangumi_id,
            anime_title: self.anime_title,
            progress: self.progress,
            download_speed: self.download_speed,
            eta: self.eta,
            num_seeds: self.num_seeds,
            num_leechers: self.num_leechers,
            save_path: self.save_path,
            category: self.category,
            published_at: self.published_at,
            discovered_at: self.discovered_at,
            downloaded_at: self.downloaded_at,
            last_synced_at: self.last_synced_at,
            error_message: self.error_message,
        }
    }
}

/// A new history row to insert. `id` is assigned by the database.
#[derive(Debug, Clone)]
pub struct NewDownloadHistoryRow {
    /// Owning subscription.
    pub subscription_id: i64,
    /// Enclosure URL or direct URL.
    pub torrent_url: String,
    /// Normalized hash.
    pub torrent_hash: String,
    /// Display title.
    pub title: String,
    /// Size in bytes, if known.
    pub file_size: Option<i64>,
    /// Initial lifecycle state.
    pub status: DownloadStatus,
    /// Submission origin.
    pub source: DownloadSource,
    /// Display fallback: external anime id.
    pub anime_bangumi_id: Option<i64>,
    /// Display fallback: upstream feed id.
    pub anime_mikan_bangumi_id: Option<String>,
    /// Display fallback: anime title.
    pub anime_title: Option<String>,
    /// Save path override, if any.
    pub save_path: Option<String>,
    /// Category label, if any.
    pub category: Option<String>,
    /// RSS item publish time, if known.
    pub published_at: Option<DateTime<Utc>>,
    /// Error detail, set only when inserting directly as `Failed`.
    pub error_message: Option<String>,
}

/// Per-row realtime fields pulled from the torrent client by the reconciler.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Hash identifying the row to update.
    pub torrent_hash: String,
    /// New lifecycle state.
    pub status: DownloadStatus,
    /// Completion percentage, `0.0..=100.0`.
    pub progress: f64,
    /// Download speed in bytes/sec.
    pub download_speed: i64,
    /// Estimated seconds remaining.
    pub eta: Option<i64>,
    /// Connected seed count.
    pub num_seeds: i32,
    /// Connected leecher count.
    pub num_leechers: i32,
    /// Error detail, set when `status` is `Failed`.
    pub error_message: Option<String>,
}

/// Feed cache header, one per `mikan_bangumi_id`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct FeedCacheHeader {
    /// Upstream feed identifier.
    pub mikan_bangumi_id: String,
    /// Season display name, if parsed.
    pub season_name: Option<String>,
    /// Maximum normalized episode number observed in the latest refresh.
    pub latest_episode: Option<i32>,
    /// Publish time of the most recent item.
    pub latest_published_at: Option<DateTime<Utc>>,
    /// Title of the most recent item.
    pub latest_title: Option<String>,
    /// Offset subtracted from upstream episode numbers to season-relative them.
    pub episode_offset: i32,
    /// Row last-update time.
    pub updated_at: DateTime<Utc>,
}

/// One RSS item normalized and cached under a [`FeedCacheHeader`].
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct FeedCacheItem {
    /// Verbatim RSS item title.
    pub title: String,
    /// Enclosure URL.
    pub torrent_url: String,
    /// Magnet URI, present or synthesized from the hash.
    pub magnet_link: Option<String>,
    /// Normalized hash, if one could be produced.
    pub torrent_hash: Option<String>,
    /// Whether this item can be submitted to the torrent client.
    pub can_download: bool,
    /// Size in bytes.
    pub file_size: Option<i64>,
    /// Human-readable size, as the upstream feed renders it.
    pub formatted_size: Option<String>,
    /// RSS `pubDate`.
    pub published_at: Option<DateTime<Utc>>,
    /// Normalized resolution (`"1080p"`, `"720p"`, `"4K"`), if parsed.
    pub resolution: Option<String>,
    /// First bracketed title prefix, if present.
    pub subgroup: Option<String>,
    /// Subtitle-type keyword match, if any.
    pub subtitle_type: Option<String>,
    /// Season-relative episode number, after offset normalization.
    pub episode: Option<i32>,
    /// Whether the title matched a batch/合集 pattern.
    pub is_collection: bool,
}

/// `(subgroup_id, subgroup_name)` entry for one upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SubgroupMappingEntry {
    /// Upstream feed identifier.
    pub mikan_bangumi_id: String,
    /// Subgroup identifier.
    pub subgroup_id: String,
    /// Subgroup display name.
    pub subgroup_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_status_round_trips_through_its_label() {
        for status in [
            DownloadStatus::Pending,
            DownloadStatus::Downloading,
            DownloadStatus::Completed,
            DownloadStatus::Failed,
            DownloadStatus::Skipped,
        ] {
            assert_eq!(DownloadStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn download_source_round_trips_through_its_label() {
        for source in [DownloadSource::Manual, DownloadSource::Subscription] {
            assert_eq!(DownloadSource::parse(source.as_str()), Some(source));
        }
    }

    #[test]
    fn unknown_status_label_is_none() {
        assert_eq!(DownloadStatus::parse("bogus"), None);
    }
}
