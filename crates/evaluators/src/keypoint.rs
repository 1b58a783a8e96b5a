//! Deterministic key-point extraction.
//!
//! A cheap, model-free one-line summary attached to every evaluation so
//! downstream dashboards can filter without re-reading full texts. Version
//! the heuristic via [`KEY_POINT_METHOD`] whenever the rules change.

use std::sync::LazyLock;

use regex::Regex;

/// Version marker recorded under `metadata.key_point_method`.
pub const KEY_POINT_METHOD: &str = "heuristic_v1";

/// Maximum number of tokens kept in a key point.
pub const MAX_KEY_POINT_WORDS: usize = 20;

static SENTENCE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence split regex is valid"));

static TOKEN_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("token split regex is valid"));

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "to", "and", "or", "in", "on", "for", "with", "is", "are", "was",
    "were", "be", "this", "that", "it", "as", "by", "at", "from", "your", "you", "i",
];

/// Generate a concise one-line key point for `text`.
///
/// Heuristics, in order: normalize whitespace; texts of at most
/// [`MAX_KEY_POINT_WORDS`] words are returned as-is; otherwise take the first
/// sentence, drop stopwords and short tokens, deduplicate preserving order,
/// and keep up to [`MAX_KEY_POINT_WORDS`] informative tokens. If filtering
/// over-prunes, the unfiltered first sentence wins.
#[must_use]
pub fn extract_key_point(text: &str) -> String {
    let original = normalize_whitespace(text);
    if original.is_empty() {
        return String::new();
    }

    let words: Vec<&str> = original.split(' ').collect();
    if words.len() <= MAX_KEY_POINT_WORDS {
        return original;
    }

    let candidate = SENTENCE_SPLIT_RE
        .split(&original)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(&original);

    let tokens: Vec<&str> = TOKEN_SPLIT_RE
        .split(candidate)
        .filter(|t| !t.is_empty())
        .collect();

    let mut seen = std::collections::HashSet::new();
    let mut filtered = Vec::new();
    for token in &tokens {
        let lower = token.to_lowercase();
        if STOPWORDS.contains(&lower.as_str()) || lower.len() < 2 {
            continue;
        }
        if seen.insert(lower) {
            filtered.push(*token);
        }
    }

    // If filtering removed too much, fall back to the raw first sentence.
    let base = if filtered.len() >= 4 { &filtered } else { &tokens };
    base.iter()
        .take(MAX_KEY_POINT_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse all whitespace runs to single spaces and trim.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
