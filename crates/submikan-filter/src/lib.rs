#![forbid(unsafe_code)]
#![deny(dead_code, unused, clippy::all)]

//! Filter Pipeline: given parsed feed items and a subscription's filter
//! settings, decide which items are new and downloadable (`spec.md` §4.4).
//!
//! Deliberately has no database dependency of its own — the caller supplies
//! the set of already-known hashes (from one batched existence query) and
//! the subgroup name→id mapping (from the subgroup-mapping cache), so this
//! crate stays a pure decision function the way `bakarr`'s
//! `process_search_result` keeps its accept/upgrade/reject decision
//! separate from how results were fetched.

use std::collections::{HashSet, HashMap};

use submikan_feed::FeedItem;
use tracing::debug;

/// The subset of a subscription's fields the filter pipeline needs.
#[derive(Debug, Clone, Default)]
pub struct FilterSettings {
    /// Required subgroup id, if the subscription pins one.
    pub subgroup_id: Option<String>,
    /// Comma/whitespace-separated tokens that must all appear in a title.
    pub keyword_include: String,
    /// Comma/whitespace-separated tokens that must not appear in a title.
    pub keyword_exclude: String,
}

/// Why one item was kept or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accept,
    RejectDuplicate,
    RejectSubgroup,
    RejectKeyword,
    RejectUndownloadable,
}

impl FilterDecision {
    /// Label used for the `filter_decisions_total{decision=...}` metric.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::RejectDuplicate => "reject_duplicate",
            Self::RejectSubgroup => "reject_subgroup",
            Self::RejectKeyword => "reject_keyword",
            Self::RejectUndownloadable => "reject_undownloadable",
        }
    }
}

/// One item's filtering verdict, retained alongside the item for callers
/// that want to log or count rejections.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub item: FeedItem,
    pub decision: FilterDecision,
}

/// Run the ordered filter pipeline over `items`, returning every item's
/// outcome. Callers select `outcome.decision == FilterDecision::Accept` for
/// the "new downloadable" set.
///
/// `existing_hashes` must already reflect a single batched existence check
/// against download history (`spec.md` §4.4 step 1 forbids N+1 queries here
/// — this function performs no I/O of its own, so that invariant is the
/// caller's to uphold).
///
/// `subgroup_name_to_id` maps a parsed title's subgroup display name to its
/// upstream id, via the subgroup-mapping cache, for step 2's match.
#[must_use]
pub fn run(
    items: Vec<FeedItem>,
    settings: &FilterSettings,
    existing_hashes: &HashSet<String>,
    subgroup_name_to_id: &HashMap<String, String>,
) -> Vec<FilterOutcome> {
    let include_tokens = tokenize(&settings.keyword_include);
    let exclude_tokens = tokenize(&settings.keyword_exclude);

    items
        .into_iter()
        .map(|item| {
            let decision = classify(
                &item,
                settings,
                existing_hashes,
                subgroup_name_to_id,
                &include_tokens,
                &exclude_tokens,
            );
            if decision != FilterDecision::Accept {
                debug!(title = %item.title, decision = decision.as_str(), "item filtered out");
            }
            FilterOutcome { item, decision }
        })
        .collect()
}

fn classify(
    item: &FeedItem,
    settings: &FilterSettings,
    existing_hashes: &HashSet<String>,
    subgroup_name_to_id: &HashMap<String, String>,
    include_tokens: &[String],
    exclude_tokens: &[String],
) -> FilterDecision {
    if let Some(hash) = &item.torrent_hash {
        if existing_hashes.contains(hash) {
            return FilterDecision::RejectDuplicate;
        }
    }

    if let Some(required_id) = &settings.subgroup_id {
        let matches = item
            .subgroup
            .as_ref()
            .and_then(|name| subgroup_name_to_id.get(name))
            .is_some_and(|id| id == required_id);
        if !matches {
            return FilterDecision::RejectSubgroup;
        }
    }

    let title_lower = item.title.to_lowercase();
    if !include_tokens.is_empty() && !include_tokens.iter().all(|token| title_lower.contains(token.as_str())) {
        return FilterDecision::RejectKeyword;
    }
    if exclude_tokens.iter().any(|token| title_lower.contains(token.as_str())) {
        return FilterDecision::RejectKeyword;
    }

    if !item.can_download {
        return FilterDecision::RejectUndownloadable;
    }

    FilterDecision::Accept
}

fn tokenize(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(title: &str, hash: Option<&str>, subgroup: Option<&str>, can_download: bool) -> FeedItem {
        FeedItem {
            title: title.to_string(),
            torrent_url: "https://example.com/t.torrent".to_string(),
            magnet_link: None,
            torrent_hash: hash.map(str::to_string),
            can_download,
            file_size: None,
            published_at: Some(Utc::now()),
            resolution: None,
            subgroup: subgroup.map(str::to_string),
            subtitle_type: None,
            episode: Some(1),
            is_collection: false,
        }
    }

    #[test]
    fn rejects_known_duplicate_hash() {
        let mut existing = HashSet::new();
        existing.insert("A".repeat(40));
        let items = vec![item("Show - 01", Some(&"A".repeat(40)), None, true)];
        let outcome = run(items, &FilterSettings::default(), &existing, &HashMap::new()).remove(0);
        assert_eq!(outcome.decision, FilterDecision::RejectDuplicate);
    }

    #[test]
    fn rejects_mismatched_subgroup() {
        let settings = FilterSettings {
            subgroup_id: Some("233".to_string()),
            ..Default::default()
        };
        let mut mapping = HashMap::new();
        mapping.insert("OtherGroup".to_string(), "999".to_string());
        let items = vec![item("Show - 01", Some(&"B".repeat(40)), Some("OtherGroup"), true)];
        let outcome = run(items, &settings, &HashSet::new(), &mapping).remove(0);
        assert_eq!(outcome.decision, FilterDecision::RejectSubgroup);
    }

    #[test]
    fn accepts_matching_subgroup() {
        let settings = FilterSettings {
            subgroup_id: Some("233".to_string()),
            ..Default::default()
        };
        let mut mapping = HashMap::new();
        mapping.insert("Lilith-Raws".to_string(), "233".to_string());
        let items = vec![item("Show - 01", Some(&"C".repeat(40)), Some("Lilith-Raws"), true)];
        let outcome = run(items, &settings, &HashSet::new(), &mapping).remove(0);
        assert_eq!(outcome.decision, FilterDecision::Accept);
    }

    #[test]
    fn include_keywords_require_all_tokens() {
        let settings = FilterSettings {
            keyword_include: "1080p, simplified".to_string(),
            ..Default::default()
        };
        let items = vec![
            item("Show - 01 [1080p][Simplified]", Some(&"D".repeat(40)), None, true),
            item("Show - 01 [720p][Simplified]", Some(&"E".repeat(40)), None, true),
        ];
        let outcomes = run(items, &settings, &HashSet::new(), &HashMap::new());
        assert_eq!(outcomes[0].decision, FilterDecision::Accept);
        assert_eq!(outcomes[1].decision, FilterDecision::RejectKeyword);
    }

    #[test]
    fn exclude_keywords_reject_any_match() {
        let settings = FilterSettings {
            keyword_exclude: "BIG5".to_string(),
            ..Default::default()
        };
        let items = vec![item("Show - 01 [BIG5]", Some(&"F".repeat(40)), None, true)];
        let outcome = run(items, &settings, &HashSet::new(), &HashMap::new()).remove(0);
        assert_eq!(outcome.decision, FilterDecision::RejectKeyword);
    }

    #[test]
    fn rejects_undownloadable_items_last() {
        let items = vec![item("Show - 01", None, None, false)];
        let outcome = run(items, &FilterSettings::default(), &HashSet::new(), &HashMap::new()).remove(0);
        assert_eq!(outcome.decision, FilterDecision::RejectUndownloadable);
    }
}
