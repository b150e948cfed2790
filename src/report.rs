//! Ranking, bucketing and tag statistics for one source note.

use crate::config::ReportConfig;
use crate::document::DocumentRef;
use crate::similarity::Reason;
use serde::Serialize;
use std::fmt;

/// One related candidate for a source note. Only built when score > 0.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub candidate: DocumentRef,
    pub score: u32,
    pub reasons: Vec<Reason>,
    pub tags: Vec<String>,
    #[serde(rename = "type")]
    pub note_type: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    ConsiderLinking,
}

impl Priority {
    /// Bucket for a score; scores below the lowest threshold have none.
    pub fn classify(score: u32, config: &ReportConfig) -> Option<Self> {
        if score > config.high_above {
            Some(Priority::High)
        } else if score >= config.medium_from {
            Some(Priority::Medium)
        } else if score >= config.low_from {
            Some(Priority::ConsiderLinking)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High Priority",
            Priority::Medium => "Medium Priority",
            Priority::ConsiderLinking => "Consider Linking",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Star rating shown next to a score: `ceil(score / step)`, capped.
pub fn stars(score: u32, config: &ReportConfig) -> u32 {
    score.div_ceil(config.star_step.max(1)).min(config.max_stars)
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BucketEntry {
    pub name: String,
    pub path: String,
    pub score: u32,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    pub high: Vec<BucketEntry>,
    pub medium: Vec<BucketEntry>,
    pub consider_linking: Vec<BucketEntry>,
}

impl Buckets {
    pub fn get(&self, priority: Priority) -> &[BucketEntry] {
        match priority {
            Priority::High => &self.high,
            Priority::Medium => &self.medium,
            Priority::ConsiderLinking => &self.consider_linking,
        }
    }

    fn push(&mut self, priority: Priority, entry: BucketEntry) {
        match priority {
            Priority::High => self.high.push(entry),
            Priority::Medium => self.medium.push(entry),
            Priority::ConsiderLinking => self.consider_linking.push(entry),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Structured output of a scan, ready for any presentation layer.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub source: DocumentRef,
    /// Related candidates found, before truncation
    pub total_related: usize,
    /// Top results, best first
    pub results: Vec<SimilarityResult>,
    /// Computed over every related candidate
    pub buckets: Buckets,
    /// Most common tags among `results`
    pub tag_table: Vec<TagCount>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.total_related == 0
    }
}

/// Sort, truncate and bucket the scan results for `source`.
///
/// `results` must be in scan order; equal scores keep that order.
pub fn build_report(
    source: DocumentRef,
    mut results: Vec<SimilarityResult>,
    config: &ReportConfig,
) -> Report {
    results.retain(|r| r.score > 0);
    results.sort_by(|a, b| b.score.cmp(&a.score));

    let mut buckets = Buckets::default();
    for result in &results {
        if let Some(priority) = Priority::classify(result.score, config) {
            buckets.push(
                priority,
                BucketEntry {
                    name: result.candidate.name.clone(),
                    path: result.candidate.path.clone(),
                    score: result.score,
                },
            );
        }
    }

    let total_related = results.len();
    results.truncate(config.detail_limit);
    let tag_table = tag_frequencies(&results, config.tag_table_limit);

    Report {
        source,
        total_related,
        results,
        buckets,
        tag_table,
    }
}

/// Count tags across results, most common first, ties in encounter order.
fn tag_frequencies(results: &[SimilarityResult], limit: usize) -> Vec<TagCount> {
    let mut table: Vec<TagCount> = Vec::new();
    for tag in results.iter().flat_map(|r| r.tags.iter()) {
        match table.iter_mut().find(|entry| &entry.tag == tag) {
            Some(entry) => entry.count += 1,
            None => table.push(TagCount {
                tag: tag.clone(),
                count: 1,
            }),
        }
    }

    table.sort_by(|a, b| b.count.cmp(&a.count));
    table.truncate(limit);
    table
}
