//! HTTP retrieval of the upstream indexing site's per-anime RSS feed, with a
//! process-local short-TTL cache to absorb bursts of scheduler ticks hitting
//! the same feed before upstream content could plausibly have changed
//! (`spec.md` §4.2).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{FeedError, FeedResult};
use crate::model::FeedResponse;
use crate::rss::{normalize_episode_offsets, parse_rss, summarize};
use crate::search::SubgroupListing;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CacheEntry {
    fetched_at: Instant,
    response: FeedResponse,
}

/// Fetches and parses per-anime RSS feeds from the upstream indexing site,
/// caching the normalized result for a short TTL per `(mikan_bangumi_id,
/// subgroup_id)` pair.
pub struct FeedFetcher {
    client: Client,
    base_url: String,
    cache_ttl: Duration,
    cache: Mutex<HashMap<(String, Option<String>), CacheEntry>>,
}

impl FeedFetcher {
    /// Build a fetcher against the given base URL (e.g.
    /// `https://mikanani.me`), with the default 30s request timeout and 60s
    /// cache TTL.
    pub fn new(base_url: impl Into<String>) -> FeedResult<Self> {
        Self::with_timeout_and_ttl(base_url, DEFAULT_TIMEOUT, DEFAULT_CACHE_TTL)
    }

    /// Build a fetcher with explicit timeout and cache TTL, primarily for
    /// tests.
    pub fn with_timeout_and_ttl(
        base_url: impl Into<String>,
        timeout: Duration,
        cache_ttl: Duration,
    ) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FeedError::from)?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            cache_ttl,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Fetch and normalize the RSS feed for one anime, optionally scoped to
    /// a single subgroup. `known_episode_count` anchors episode-offset
    /// normalization (see [`crate::rss::normalize_episode_offsets`]).
    ///
    /// Serves a cached response when one exists and is within the TTL;
    /// cache hits and misses are independent per `(mikan_bangumi_id,
    /// subgroup_id)` key, so scoping to a subgroup never reuses the
    /// all-subgroups entry or vice versa.
    pub async fn fetch_feed(
        &self,
        mikan_bangumi_id: &str,
        subgroup_id: Option<&str>,
        known_episode_count: Option<i32>,
    ) -> FeedResult<FeedResponse> {
        let key = (mikan_bangumi_id.to_string(), subgroup_id.map(str::to_string));
        if let Some(cached) = self.cached(&key) {
            debug!(mikan_bangumi_id, "serving feed from process-local cache");
            return Ok(cached);
        }

        let url = match subgroup_id {
            Some(subgroup) => format!(
                "{}/RSS/Bangumi?bangumiId={}&subgroupid={}",
                self.base_url, mikan_bangumi_id, subgroup
            ),
            None => format!("{}/RSS/Bangumi?bangumiId={}", self.base_url, mikan_bangumi_id),
        };

        let body = self.get_text(&url).await?;
        let (season_name, mut items) = parse_rss(&body)?;
        let offset = normalize_episode_offsets(&mut items, known_episode_count);
        let response = summarize(season_name, offset, items);

        self.cache
            .lock()
            .expect("feed cache mutex poisoned")
            .insert(
                key,
                CacheEntry {
                    fetched_at: Instant::now(),
                    response: response.clone(),
                },
            );

        Ok(response)
    }

    /// Search the upstream site's anime index by free-text query, returning
    /// `(bangumi_id, title)` pairs. Best-effort HTML scrape; see
    /// [`crate::search`].
    pub async fn search_anime(&self, query: &str) -> FeedResult<Vec<(String, String)>> {
        let url = format!("{}/Home/Search?searchstr={}", self.base_url, urlencode(query));
        let body = self.get_text(&url).await?;
        crate::search::parse_search_results(&body)
    }

    /// List the subgroups that have released content for a given anime.
    pub async fn list_subgroups(&self, mikan_bangumi_id: &str) -> FeedResult<Vec<SubgroupListing>> {
        let url = format!("{}/Home/Bangumi/{}", self.base_url, mikan_bangumi_id);
        let body = self.get_text(&url).await?;
        crate::search::parse_subgroup_listing(&body)
    }

    fn cached(&self, key: &(String, Option<String>)) -> Option<FeedResponse> {
        let cache = self.cache.lock().expect("feed cache mutex poisoned");
        let entry = cache.get(key)?;
        if entry.fetched_at.elapsed() < self.cache_ttl {
            Some(entry.response.clone())
        } else {
            None
        }
    }

    async fn get_text(&self, url: &str) -> FeedResult<String> {
        let response = self.client.get(url).send().await.map_err(|err| {
            warn!(url, error = %err, "feed request failed");
            FeedError::from(err)
        })?;

        if !response.status().is_success() {
            return Err(FeedError::HttpStatus(response.status().as_u16()));
        }

        response.text().await.map_err(FeedError::from)
    }
}

fn urlencode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_distinguishes_subgroup_scope() {
        let fetcher = FeedFetcher::new("https://example.invalid").expect("client builds");
        assert!(fetcher.cached(&("123".to_string(), None)).is_none());
        assert!(fetcher
            .cached(&("123".to_string(), Some("233".to_string())))
            .is_none());
    }
}
