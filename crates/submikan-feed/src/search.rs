//! Best-effort HTML scraping of the upstream indexing site's search and
//! per-anime subgroup listing pages (`spec.md` §6, "SearchAnime").
//!
//! The upstream site exposes no structured API for these two operations, so
//! this module pattern-matches the handful of anchor/list shapes its HTML
//! has used historically. A layout change upstream degrades results to an
//! empty list rather than an error — these are user-facing convenience
//! lookups, not part of the download pipeline's correctness.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::FeedResult;

/// One subgroup known to have released content for a given anime.
#[derive(Debug, Clone, PartialEq)]
pub struct SubgroupListing {
    pub subgroup_id: String,
    pub subgroup_name: String,
}

static SEARCH_RESULT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a[^>]*href="/Home/Bangumi/(\d+)"[^>]*>\s*(?:<[^>]*>\s*)*([^<]+?)\s*(?:<.*?</a>|</a>)"#)
        .expect("search result regex is valid")
});

static SUBGROUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"data-subgroupid="(\d+)"[^>]*>\s*([^<]+?)\s*<"#)
        .expect("subgroup listing regex is valid")
});

/// Parse `(bangumi_id, title)` pairs out of a search-results page.
pub fn parse_search_results(html: &str) -> FeedResult<Vec<(String, String)>> {
    Ok(SEARCH_RESULT_RE
        .captures_iter(html)
        .map(|caps| (caps[1].to_string(), decode_entities(caps[2].trim())))
        .collect())
}

/// Parse the list of subgroups that have released content for an anime, out
/// of its per-anime page.
pub fn parse_subgroup_listing(html: &str) -> FeedResult<Vec<SubgroupListing>> {
    Ok(SUBGROUP_RE
        .captures_iter(html)
        .map(|caps| SubgroupListing {
            subgroup_id: caps[1].to_string(),
            subgroup_name: decode_entities(caps[2].trim()),
        })
        .collect())
}

fn decode_entities(raw: &str) -> String {
    raw.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_result_anchors() {
        let html = r#"
            <div class="list">
              <a href="/Home/Bangumi/3288" class="an-text">Test Anime Season 2</a>
              <a href="/Home/Bangumi/501" class="an-text">Another Show</a>
            </div>
        "#;
        let results = parse_search_results(html).expect("parses");
        assert_eq!(
            results,
            vec![
                ("3288".to_string(), "Test Anime Season 2".to_string()),
                ("501".to_string(), "Another Show".to_string()),
            ]
        );
    }

    #[test]
    fn parses_subgroup_listing() {
        let html = r#"
            <div data-subgroupid="233" class="subgroup">Lilith-Raws</div>
            <div data-subgroupid="382" class="subgroup">Some &amp; Subs</div>
        "#;
        let results = parse_subgroup_listing(html).expect("parses");
        assert_eq!(
            results,
            vec![
                SubgroupListing { subgroup_id: "233".to_string(), subgroup_name: "Lilith-Raws".to_string() },
                SubgroupListing { subgroup_id: "382".to_string(), subgroup_name: "Some & Subs".to_string() },
            ]
        );
    }

    #[test]
    fn returns_empty_on_unrecognized_layout() {
        let results = parse_search_results("<html><body>no matches here</body></html>").expect("parses");
        assert!(results.is_empty());
    }
}
