//! Normalized feed types shared between the fetcher, parser, and callers.

use chrono::{DateTime, Utc};

/// One normalized RSS item, after title parsing and episode-offset
/// normalization (`spec.md` §4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    /// Verbatim RSS item title.
    pub title: String,
    /// Enclosure URL.
    pub torrent_url: String,
    /// Magnet URI, present in the feed or synthesized from the hash.
    pub magnet_link: Option<String>,
    /// Normalized 40-character uppercase hex hash, if one could be produced.
    pub torrent_hash: Option<String>,
    /// `false` when no valid hash could be produced; such items are never
    /// submitted to the torrent client.
    pub can_download: bool,
    /// Size in bytes, from the enclosure `length` or `torrent:contentLength`.
    pub file_size: Option<i64>,
    /// RSS `pubDate`, parsed from RFC 822.
    pub published_at: Option<DateTime<Utc>>,
    /// Normalized resolution: `"1080p"`, `"720p"`, `"4K"`, or `None`.
    pub resolution: Option<String>,
    /// First bracketed title prefix, interpreted as the releasing subgroup.
    pub subgroup: Option<String>,
    /// Subtitle-type keyword match (e.g. `"简日内嵌"`, `"繁日"`, `"内嵌"`, `"外挂"`).
    pub subtitle_type: Option<String>,
    /// Season-relative episode number, after offset normalization.
    pub episode: Option<i32>,
    /// Whether the title matched a batch/合集 pattern or spans a range.
    pub is_collection: bool,
}

/// Parsed and normalized contents of one upstream RSS feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedResponse {
    /// Normalized items, sorted by `published_at` descending.
    pub items: Vec<FeedItem>,
    /// Maximum normalized episode number across `items`.
    pub latest_episode: Option<i32>,
    /// Publish time of the most recent item.
    pub latest_published_at: Option<DateTime<Utc>>,
    /// Title of the most recent item.
    pub latest_title: Option<String>,
    /// Integer subtracted from upstream episode numbers to season-relative
    /// them. Zero when no renumbering was detected.
    pub episode_offset: i32,
    /// Season display name, if the upstream feed exposes one.
    pub season_name: Option<String>,
}
