//! Tag usage across a vault: counts, near-duplicate tags and gaps in
//! `parent/child` tag hierarchies.
//!
//! A note's tags are its front-matter `tags` plus inline `#tags` in the
//! body. Each tag counts at most once per note.

use crate::config::TagConfig;
use crate::document::{Document, FENCED_CODE_RE};
use crate::error::ScanError;
use crate::report::TagCount;
use crate::store::DocumentStore;
use ahash::{AHashMap, AHashSet};
use regex::Regex;
use serde::Serialize;
use similar::TextDiff;
use std::sync::LazyLock;
use std::time::Instant;

static INLINE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)#([\w/\-]+)").expect("valid regex"));

/// `#tag` occurrences in `text`, in order of first appearance.
///
/// A tag must start the text or follow whitespace, so headings and URL
/// fragments are skipped. Purely numeric tags and fenced code are ignored.
pub fn extract_inline_tags(text: &str) -> Vec<String> {
    let text = FENCED_CODE_RE.replace_all(text, "");

    let mut seen = AHashSet::new();
    let mut tags = Vec::new();
    for cap in INLINE_TAG_RE.captures_iter(&text) {
        let tag = cap[1].trim_end_matches('/');
        if tag.is_empty() || tag.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if seen.insert(tag.to_string()) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Front-matter tags first, then inline tags not already present.
pub fn note_tags(doc: &Document) -> Vec<String> {
    let mut tags = doc.tags().to_vec();
    for tag in extract_inline_tags(doc.body()) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TagUsage {
    pub tag: String,
    pub count: usize,
    /// Paths of the notes carrying the tag
    pub notes: Vec<String>,
}

/// Tag counts over a set of notes, kept in order of first encounter.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    entries: Vec<TagUsage>,
    slots: AHashMap<String, usize>,
}

impl TagIndex {
    pub fn from_documents(docs: &[Document]) -> Self {
        let mut index = Self::default();
        for doc in docs {
            for tag in note_tags(doc) {
                index.add(&tag, &doc.path);
            }
        }
        index
    }

    pub fn add(&mut self, tag: &str, note: &str) {
        match self.slots.get(tag) {
            Some(&slot) => {
                let usage = &mut self.entries[slot];
                usage.count += 1;
                usage.notes.push(note.to_string());
            }
            None => {
                self.slots.insert(tag.to_string(), self.entries.len());
                self.entries.push(TagUsage {
                    tag: tag.to_string(),
                    count: 1,
                    notes: vec![note.to_string()],
                });
            }
        }
    }

    /// Drop tags used fewer than `min` times.
    pub fn retain_min_count(&mut self, min: usize) {
        self.entries.retain(|usage| usage.count >= min);
        self.slots = self
            .entries
            .iter()
            .enumerate()
            .map(|(slot, usage)| (usage.tag.clone(), slot))
            .collect();
    }

    pub fn count(&self, tag: &str) -> usize {
        self.slots.get(tag).map_or(0, |&slot| self.entries[slot].count)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.slots.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_occurrences(&self) -> usize {
        self.entries.iter().map(|usage| usage.count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagUsage> {
        self.entries.iter()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SimilarTags {
    pub first: String,
    pub second: String,
    pub similarity: f32,
}

/// Fold `merge` into `keep`, the more used of a similar pair.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MergeSuggestion {
    pub keep: String,
    pub merge: String,
    pub similarity: f32,
    pub total_count: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RootTag {
    pub tag: String,
    pub count: usize,
    /// Distinct direct children seen under this tag
    pub children: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NestedTag {
    pub tag: String,
    pub count: usize,
    pub depth: usize,
}

/// A nested tag whose ancestor is never used as a tag itself.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MissingParent {
    pub tag: String,
    pub parent: String,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
    pub roots: Vec<RootTag>,
    pub nested: Vec<NestedTag>,
    pub max_depth: usize,
    pub missing_parents: Vec<MissingParent>,
}

/// Tags grouped by their first path segment.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TagCategory {
    pub name: String,
    pub total: usize,
    pub tags: Vec<TagCount>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TagReport {
    pub notes_scanned: usize,
    pub unique_tags: usize,
    pub total_occurrences: usize,
    pub average_per_tag: f64,
    pub most_common: Vec<TagCount>,
    /// Rarest first; only filled when there are more tags than the list length
    pub least_common: Vec<TagCount>,
    /// Tags used exactly once
    pub orphans: Vec<String>,
    pub similar: Vec<SimilarTags>,
    pub merges: Vec<MergeSuggestion>,
    pub hierarchy: Hierarchy,
    pub categories: Vec<TagCategory>,
}

fn normalize_tag(tag: &str) -> String {
    tag.to_lowercase().replace(['-', '_'], "")
}

/// Ratio in `0.0..=1.0` of two tags after lower-casing and dropping `-`
/// and `_`: twice the matching characters over the combined length.
pub fn tag_similarity(a: &str, b: &str) -> f32 {
    let a = normalize_tag(a);
    let b = normalize_tag(b);
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio()
}

/// Every pair at or above `threshold`, most similar first.
pub fn find_similar_tags(index: &TagIndex, threshold: f32) -> Vec<SimilarTags> {
    let tags: Vec<&str> = index.iter().map(|usage| usage.tag.as_str()).collect();

    let mut pairs = Vec::new();
    for (i, first) in tags.iter().enumerate() {
        for second in &tags[i + 1..] {
            let similarity = tag_similarity(first, second);
            if similarity >= threshold {
                pairs.push(SimilarTags {
                    first: first.to_string(),
                    second: second.to_string(),
                    similarity,
                });
            }
        }
    }

    pairs.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    pairs
}

/// Keep the more used tag of each pair; ties keep the first.
pub fn suggest_merges(index: &TagIndex, similar: &[SimilarTags]) -> Vec<MergeSuggestion> {
    similar
        .iter()
        .map(|pair| {
            let (keep, merge) = if index.count(&pair.first) >= index.count(&pair.second) {
                (&pair.first, &pair.second)
            } else {
                (&pair.second, &pair.first)
            };
            MergeSuggestion {
                keep: keep.clone(),
                merge: merge.clone(),
                similarity: pair.similarity,
                total_count: index.count(keep) + index.count(merge),
            }
        })
        .collect()
}

pub fn analyze_hierarchy(index: &TagIndex) -> Hierarchy {
    // parent -> distinct direct children, including intermediate prefixes
    let mut children: AHashMap<&str, AHashSet<&str>> = AHashMap::new();
    for usage in index.iter() {
        let tag = usage.tag.as_str();
        for (pos, _) in tag.match_indices('/') {
            let child_end = tag[pos + 1..].find('/').map_or(tag.len(), |n| pos + 1 + n);
            children.entry(&tag[..pos]).or_default().insert(&tag[..child_end]);
        }
    }

    let mut hierarchy = Hierarchy::default();
    for usage in index.iter() {
        let depth = usage.tag.matches('/').count() + 1;
        hierarchy.max_depth = hierarchy.max_depth.max(depth);

        if depth == 1 {
            hierarchy.roots.push(RootTag {
                tag: usage.tag.clone(),
                count: usage.count,
                children: children.get(usage.tag.as_str()).map_or(0, |set| set.len()),
            });
            continue;
        }

        hierarchy.nested.push(NestedTag {
            tag: usage.tag.clone(),
            count: usage.count,
            depth,
        });
        for (pos, _) in usage.tag.match_indices('/') {
            let parent = &usage.tag[..pos];
            if !parent.is_empty() && !index.contains(parent) {
                hierarchy.missing_parents.push(MissingParent {
                    tag: usage.tag.clone(),
                    parent: parent.to_string(),
                });
            }
        }
    }

    hierarchy.roots.sort_by(|a, b| b.count.cmp(&a.count));
    hierarchy
}

fn categorize(index: &TagIndex, config: &TagConfig) -> Vec<TagCategory> {
    let mut categories: Vec<TagCategory> = Vec::new();
    let mut slots: AHashMap<&str, usize> = AHashMap::new();

    for usage in index.iter() {
        let name = usage
            .tag
            .split_once('/')
            .map_or(usage.tag.as_str(), |(root, _)| root);
        let slot = *slots.entry(name).or_insert_with(|| {
            categories.push(TagCategory {
                name: name.to_string(),
                total: 0,
                tags: Vec::new(),
            });
            categories.len() - 1
        });

        let category = &mut categories[slot];
        category.total += usage.count;
        category.tags.push(TagCount {
            tag: usage.tag.clone(),
            count: usage.count,
        });
    }

    categories.sort_by(|a, b| b.total.cmp(&a.total));
    categories.truncate(config.top);
    for category in &mut categories {
        category.tags.sort_by(|a, b| b.count.cmp(&a.count));
        category.tags.truncate(config.tags_per_category);
    }
    categories
}

/// Tag statistics over `docs`. Ties in every ranking keep first-encounter
/// order.
pub fn analyze_tags(docs: &[Document], config: &TagConfig) -> TagReport {
    let mut index = TagIndex::from_documents(docs);
    if config.min_count > 1 {
        index.retain_min_count(config.min_count);
    }

    let mut ranked: Vec<TagCount> = index
        .iter()
        .map(|usage| TagCount {
            tag: usage.tag.clone(),
            count: usage.count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));

    let unique_tags = index.len();
    let total_occurrences = index.total_occurrences();
    let least_common = if unique_tags > config.top {
        ranked.iter().rev().take(config.top).cloned().collect()
    } else {
        Vec::new()
    };
    ranked.truncate(config.top);

    let similar = find_similar_tags(&index, config.similarity_threshold);
    let merges = suggest_merges(&index, &similar);

    TagReport {
        notes_scanned: docs.len(),
        unique_tags,
        total_occurrences,
        average_per_tag: if unique_tags == 0 {
            0.0
        } else {
            total_occurrences as f64 / unique_tags as f64
        },
        most_common: ranked,
        least_common,
        orphans: index
            .iter()
            .filter(|usage| usage.count == 1)
            .map(|usage| usage.tag.clone())
            .collect(),
        similar,
        merges,
        hierarchy: analyze_hierarchy(&index),
        categories: categorize(&index, config),
    }
}

/// Read every document in `store` and analyze its tags.
///
/// Like a related-note scan, any read failure aborts the whole run.
pub fn scan_tags<S: DocumentStore + ?Sized>(
    store: &S,
    config: &TagConfig,
) -> Result<TagReport, ScanError> {
    let start = Instant::now();

    let refs = store.list_documents().map_err(ScanError::List)?;
    let mut docs = Vec::with_capacity(refs.len());
    for doc_ref in &refs {
        let doc = store.snapshot(doc_ref).map_err(|source| ScanError::Read {
            path: doc_ref.path.clone(),
            source,
        })?;
        docs.push(doc);
    }

    let report = analyze_tags(&docs, config);
    tracing::info!(
        scanned = docs.len(),
        unique = report.unique_tags,
        elapsed = ?start.elapsed(),
        "tag scan complete"
    );

    Ok(report)
}
