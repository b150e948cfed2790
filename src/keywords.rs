//! Keyword extraction from raw note text.

use ahash::{AHashMap, AHashSet};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Common English function words that never count as keywords.
pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
    "of", "with", "by", "from", "as", "is", "was", "are", "were", "been",
    "be", "have", "has", "had", "do", "does", "did", "will", "would",
    "could", "should", "may", "might", "can", "this", "that", "these",
    "those", "i", "you", "he", "she", "it", "we", "they", "what", "which",
    "who", "when", "where", "why", "how", "all", "each", "every", "both",
    "few", "more", "most", "other", "some", "such", "not", "only", "own",
    "same", "so", "than", "too", "very",
];

/// Tokens at or below this many characters are dropped.
const MIN_TOKEN_CHARS: usize = 3;

static STOP_SET: LazyLock<AHashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

static FENCED_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));
static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]+`").expect("valid regex"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("valid regex"));
static MARKDOWN_PUNCT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#*_\[\]()]").expect("valid regex"));

/// Keywords of one document, most frequent first.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct KeywordProfile(Vec<String>);

impl KeywordProfile {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct keywords present in both profiles
    pub fn shared_with(&self, other: &KeywordProfile) -> usize {
        let theirs: AHashSet<&str> = other.0.iter().map(String::as_str).collect();
        let ours: AHashSet<&str> = self.0.iter().map(String::as_str).collect();
        ours.intersection(&theirs).count()
    }
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_SET.contains(word)
}

/// Remove code, URLs and markdown punctuation, then lower-case.
fn clean_text(text: &str) -> String {
    let text = FENCED_CODE_RE.replace_all(text, "");
    let text = INLINE_CODE_RE.replace_all(&text, "");
    let text = URL_RE.replace_all(&text, "");
    let text = MARKDOWN_PUNCT_RE.replace_all(&text, "");
    text.to_lowercase()
}

/// Extract up to `limit` keywords, ranked by frequency.
///
/// Ties keep the order in which tokens were first seen, so the result is
/// deterministic for a given text.
pub fn extract_keywords(text: &str, limit: usize) -> KeywordProfile {
    let cleaned = clean_text(text);

    // token -> slot in `counts`, which stays in first-seen order
    let mut slots: AHashMap<&str, usize> = AHashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for token in cleaned.split_whitespace() {
        if token.chars().count() <= MIN_TOKEN_CHARS || is_stop_word(token) {
            continue;
        }
        match slots.get(token) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(token, counts.len());
                counts.push((token, 1));
            }
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);

    KeywordProfile(counts.into_iter().map(|(token, _)| token.to_string()).collect())
}
