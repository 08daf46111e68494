//! RSS 2.0 parsing of the upstream indexing site's per-anime feed, plus
//! episode-offset normalization (`spec.md` §4.3).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{FeedError, FeedResult};
use crate::model::{FeedItem, FeedResponse};
use crate::title;
use submikan_torrent_core::hash::{extract_hash_from_magnet, normalize_info_hash};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    title: Option<String>,
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: String,
    enclosure: Option<Enclosure>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(rename = "torrent:contentLength")]
    content_length: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: String,
    #[serde(rename = "@length")]
    length: Option<i64>,
}

/// Parse an RSS 2.0 document into normalized [`FeedItem`]s, with no
/// episode-offset normalization applied yet.
pub fn parse_rss(body: &str) -> FeedResult<(Option<String>, Vec<FeedItem>)> {
    let feed: Rss =
        quick_xml::de::from_str(body).map_err(|err| FeedError::ParseError(err.to_string()))?;

    let items = feed
        .channel
        .items
        .into_iter()
        .map(parse_item)
        .collect::<Vec<_>>();

    Ok((feed.channel.title, items))
}

fn parse_item(item: Item) -> FeedItem {
    let torrent_url = item
        .enclosure
        .as_ref()
        .map(|e| e.url.clone())
        .unwrap_or_default();
    let magnet_link = if torrent_url.starts_with("magnet:") {
        Some(torrent_url.clone())
    } else {
        None
    };
    let torrent_hash = magnet_link
        .as_deref()
        .and_then(extract_hash_from_magnet)
        .and_then(|h| normalize_info_hash(&h));

    let file_size = item
        .enclosure
        .as_ref()
        .and_then(|e| e.length)
        .or(item.content_length);

    let published_at = item
        .pub_date
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc2822(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    FeedItem {
        can_download: torrent_hash.is_some(),
        resolution: title::parse_resolution(&item.title),
        subgroup: title::parse_subgroup(&item.title),
        subtitle_type: title::parse_subtitle_type(&item.title),
        episode: title::parse_episode(&item.title),
        is_collection: title::is_collection(&item.title),
        title: item.title,
        torrent_url,
        magnet_link,
        torrent_hash,
        file_size,
        published_at,
    }
}

/// Detect the smallest episode number among single-episode items and
/// subtract it from every item's `episode` so the result is season-relative,
/// per `spec.md` §4.3's offset-normalization rule. `known_episode_count`, the
/// count of episodes already recorded for this season, anchors the
/// subtraction so a feed that starts mid-season (e.g. episode 13 of a
/// second cour) still normalizes to episode 1.
pub fn normalize_episode_offsets(items: &mut [FeedItem], known_episode_count: Option<i32>) -> i32 {
    let min_observed = items
        .iter()
        .filter(|item| !item.is_collection)
        .filter_map(|item| item.episode)
        .min();

    let Some(min_observed) = min_observed else {
        return 0;
    };

    let expected_start = known_episode_count.map_or(1, |count| count + 1);
    let offset = min_observed - expected_start;
    if offset <= 0 {
        return 0;
    }

    for item in items.iter_mut() {
        if let Some(episode) = item.episode {
            item.episode = Some(episode - offset);
        }
    }
    offset
}

/// Build the aggregate [`FeedResponse`] summary fields from already-parsed,
/// offset-normalized items.
pub fn summarize(season_name: Option<String>, episode_offset: i32, mut items: Vec<FeedItem>) -> FeedResponse {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    let latest = items.first();
    let latest_episode = items.iter().filter_map(|item| item.episode).max();

    FeedResponse {
        latest_published_at: latest.and_then(|item| item.published_at),
        latest_title: latest.map(|item| item.title.clone()),
        latest_episode,
        episode_offset,
        season_name,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Anime - Subgroup Feed</title>
    <item>
      <title>[Group] Test Anime - 13 [1080p][简日内嵌]</title>
      <enclosure url="magnet:?xt=urn:btih:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA" length="734003200" type="application/x-bittorrent"/>
      <pubDate>Mon, 28 Jul 2026 12:00:00 +0000</pubDate>
      <torrent:contentLength>734003200</torrent:contentLength>
    </item>
    <item>
      <title>[Group] Test Anime - 14 [1080p][简日内嵌]</title>
      <enclosure url="magnet:?xt=urn:btih:BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB" length="734003200" type="application/x-bittorrent"/>
      <pubDate>Mon, 28 Jul 2026 13:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_and_hashes() {
        let (title, items) = parse_rss(SAMPLE_RSS).expect("valid rss");
        assert_eq!(title, Some("Test Anime - Subgroup Feed".to_string()));
        assert_eq!(items.len(), 2);
        assert!(items[0].can_download);
        assert_eq!(items[0].episode, Some(13));
        assert_eq!(items[0].resolution, Some("1080p".to_string()));
    }

    #[test]
    fn normalizes_offset_for_second_cour() {
        let (_, mut items) = parse_rss(SAMPLE_RSS).expect("valid rss");
        let offset = normalize_episode_offsets(&mut items, Some(12));
        assert_eq!(offset, 0);
        assert_eq!(items[0].episode, Some(13));

        let (_, mut items) = parse_rss(SAMPLE_RSS).expect("valid rss");
        let offset = normalize_episode_offsets(&mut items, Some(0));
        assert_eq!(offset, 12);
        assert_eq!(items[0].episode, Some(1));
        assert_eq!(items[1].episode, Some(2));
    }

    #[test]
    fn summarize_picks_latest_by_published_at() {
        let (title, items) = parse_rss(SAMPLE_RSS).expect("valid rss");
        let response = summarize(title, 0, items);
        assert_eq!(response.latest_episode, Some(14));
        assert_eq!(response.latest_title, Some("[Group] Test Anime - 14 [1080p][简日内嵌]".to_string()));
    }

    #[test]
    fn rejects_malformed_xml() {
        let result = parse_rss("not xml at all");
        assert!(result.is_err());
    }
}
