//! Torrent-title parsing: resolution, subgroup, subtitle type, episode
//! number, and batch/collection detection (`spec.md` §4.3).

use once_cell::sync::Lazy;
use regex::Regex;

const SUBTITLE_KEYWORDS: &[&str] = &["简日内嵌", "繁日内嵌", "简日", "繁日", "简体", "繁体", "内嵌", "外挂"];
const COLLECTION_KEYWORDS: &[&str] = &["合集", "全集", "Batch", "BATCH", "batch"];

static RESOLUTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(2160p|4k|1080p|720p|480p)").expect("resolution regex is valid")
});

static BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\[【]([^\]】]+)[\]】]").expect("bracket regex is valid"));

// Matches a standalone episode number: optional leading zero, 1-4 digits,
// not immediately preceded/followed by more digits. Looks for patterns like
// "- 12 " or "[12]" or "第12话" common across fansub naming conventions.
static EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:第\s*(\d{1,4})\s*[话話集]|[\[\s-](\d{1,4})(?:v\d)?(?:[\]\s_.]|$))")
        .expect("episode regex is valid")
});

static RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,4})\s*[-~]\s*(\d{1,4})").expect("range regex is valid"));

/// Normalize a detected resolution token to one of `"4K"`, `"1080p"`,
/// `"720p"`, `"480p"`, or `None`.
#[must_use]
pub fn parse_resolution(title: &str) -> Option<String> {
    let raw = RESOLUTION_RE.captures(title)?.get(1)?.as_str().to_ascii_lowercase();
    Some(match raw.as_str() {
        "2160p" | "4k" => "4K".to_string(),
        "1080p" => "1080p".to_string(),
        "720p" => "720p".to_string(),
        "480p" => "480p".to_string(),
        other => other.to_string(),
    })
}

/// Extract the first bracketed title prefix, interpreted as the releasing
/// subgroup's display name.
#[must_use]
pub fn parse_subgroup(title: &str) -> Option<String> {
    BRACKET_RE
        .captures(title.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Search for a known subtitle-type keyword anywhere in the title.
#[must_use]
pub fn parse_subtitle_type(title: &str) -> Option<String> {
    SUBTITLE_KEYWORDS
        .iter()
        .find(|keyword| title.contains(*keyword))
        .map(|keyword| (*keyword).to_string())
}

/// Whether the title matches a batch/合集 pattern or spans an episode range.
#[must_use]
pub fn is_collection(title: &str) -> bool {
    COLLECTION_KEYWORDS.iter().any(|keyword| title.contains(keyword)) || RANGE_RE.is_match(title)
}

/// Extract a single episode number, when the title names exactly one
/// episode (not a collection/batch release).
#[must_use]
pub fn parse_episode(title: &str) -> Option<i32> {
    if is_collection(title) {
        return None;
    }
    let caps = EPISODE_RE.captures(title)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_resolutions() {
        assert_eq!(parse_resolution("[Group] Show - 01 [1080p][简日内嵌]"), Some("1080p".to_string()));
        assert_eq!(parse_resolution("[Group] Show - 01 [720P]"), Some("720p".to_string()));
        assert_eq!(parse_resolution("[Group] Show - 01 [4K]"), Some("4K".to_string()));
        assert_eq!(parse_resolution("[Group] Show - 01"), None);
    }

    #[test]
    fn parses_leading_bracket_as_subgroup() {
        assert_eq!(
            parse_subgroup("[Lilith-Raws] Show - 01 [1080p]"),
            Some("Lilith-Raws".to_string())
        );
        assert_eq!(
            parse_subgroup("【喵萌奶茶屋】Show - 01"),
            Some("喵萌奶茶屋".to_string())
        );
    }

    #[test]
    fn detects_subtitle_type_keywords() {
        assert_eq!(
            parse_subtitle_type("[Group] Show - 01 [1080p][简日内嵌]"),
            Some("简日内嵌".to_string())
        );
        assert_eq!(parse_subtitle_type("[Group] Show - 01 [1080p]"), None);
    }

    #[test]
    fn detects_collection_titles() {
        assert!(is_collection("[Group] Show [01-12合集][1080p]"));
        assert!(is_collection("[Group] Show 01-12 [Batch]"));
        assert!(!is_collection("[Group] Show - 05 [1080p]"));
    }

    #[test]
    fn parses_single_episode_number() {
        assert_eq!(parse_episode("[Group] Show - 05 [1080p]"), Some(5));
        assert_eq!(parse_episode("[Group] Show - 25 [720p]"), Some(25));
        assert_eq!(parse_episode("[Group] Show [01-12合集][1080p]"), None);
    }
}
