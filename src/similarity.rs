//! Pairwise relatedness between a source note and one candidate.

use crate::config::ScoringConfig;
use crate::keywords::KeywordProfile;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// What the source note contributes to every comparison.
#[derive(Debug, Clone, Copy)]
pub struct SourceSignals<'a> {
    pub keywords: &'a KeywordProfile,
    pub tags: &'a [String],
    pub links: &'a HashSet<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct CandidateSignals<'a> {
    pub name: &'a str,
    pub keywords: &'a KeywordProfile,
    pub tags: &'a [String],
}

/// Why a candidate scored. Displays as the human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    SharedKeywords(usize),
    SharedTags { count: usize, sample: Vec<String> },
    AlreadyLinked,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::SharedKeywords(count) => write!(f, "{} shared keywords", count),
            Reason::SharedTags { count, sample } => {
                write!(f, "{} shared tags: {}", count, sample.join(", "))
            }
            Reason::AlreadyLinked => f.write_str("Already linked"),
        }
    }
}

impl Serialize for Reason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Similarity {
    pub score: u32,
    pub reasons: Vec<Reason>,
}

impl Similarity {
    pub fn is_related(&self) -> bool {
        self.score > 0
    }

    /// Weights come from user config, so the total saturates at `u32::MAX`.
    fn add(&mut self, weight: u32, times: usize) {
        let times = u32::try_from(times).unwrap_or(u32::MAX);
        self.score = self.score.saturating_add(weight.saturating_mul(times));
    }
}

/// Additive score: shared keywords, shared tags and an existing link each
/// contribute independently. There is no cap below `u32::MAX`.
pub fn score(
    source: &SourceSignals<'_>,
    candidate: &CandidateSignals<'_>,
    weights: &ScoringConfig,
) -> Similarity {
    let mut similarity = Similarity::default();

    let shared_keywords = source.keywords.shared_with(candidate.keywords);
    if shared_keywords > 0 {
        similarity.add(weights.keyword_weight, shared_keywords);
        similarity.reasons.push(Reason::SharedKeywords(shared_keywords));
    }

    // Source tag order is kept for the sample
    let shared_tags: Vec<&String> = source
        .tags
        .iter()
        .filter(|tag| candidate.tags.contains(*tag))
        .collect();
    if !shared_tags.is_empty() {
        similarity.add(weights.tag_weight, shared_tags.len());
        similarity.reasons.push(Reason::SharedTags {
            count: shared_tags.len(),
            sample: shared_tags
                .iter()
                .take(weights.shared_tag_sample)
                .map(|tag| tag.to_string())
                .collect(),
        });
    }

    if source.links.contains(candidate.name) {
        similarity.add(weights.link_bonus, 1);
        similarity.reasons.push(Reason::AlreadyLinked);
    }

    similarity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::extract_keywords;

    fn tags(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn links(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unrelated_pair_scores_zero() {
        let kw_a = extract_keywords("rust compiler borrow checker", 30);
        let kw_b = extract_keywords("sourdough bread baking", 30);
        let tags_a = tags(&["code"]);
        let tags_b = tags(&["food"]);
        let no_links = links(&[]);

        let source = SourceSignals { keywords: &kw_a, tags: &tags_a, links: &no_links };
        let candidate = CandidateSignals { name: "Bread", keywords: &kw_b, tags: &tags_b };

        let sim = score(&source, &candidate, &ScoringConfig::default());
        assert_eq!(sim.score, 0);
        assert!(sim.reasons.is_empty());
        assert!(!sim.is_related());
    }

    #[test]
    fn test_shared_keywords() {
        let kw_a = extract_keywords("tokio runtime async executor", 30);
        let kw_b = extract_keywords("async runtime design", 30);
        let empty: Vec<String> = Vec::new();
        let no_links = links(&[]);

        let source = SourceSignals { keywords: &kw_a, tags: &empty, links: &no_links };
        let candidate = CandidateSignals { name: "B", keywords: &kw_b, tags: &empty };

        let sim = score(&source, &candidate, &ScoringConfig::default());
        assert_eq!(sim.score, 4);
        assert_eq!(sim.reasons, vec![Reason::SharedKeywords(2)]);
        assert_eq!(sim.reasons[0].to_string(), "2 shared keywords");
    }

    #[test]
    fn test_shared_tags_in_source_order() {
        let kw = KeywordProfile::default();
        let source_tags = tags(&["a", "b", "c"]);
        let candidate_tags = tags(&["d", "c", "b"]);
        let no_links = links(&[]);

        let source = SourceSignals { keywords: &kw, tags: &source_tags, links: &no_links };
        let candidate = CandidateSignals { name: "X", keywords: &kw, tags: &candidate_tags };

        let sim = score(&source, &candidate, &ScoringConfig::default());
        assert_eq!(sim.score, 10);
        assert_eq!(sim.reasons.len(), 1);
        assert_eq!(sim.reasons[0].to_string(), "2 shared tags: b, c");
    }

    #[test]
    fn test_shared_tag_sample_capped_at_three() {
        let kw = KeywordProfile::default();
        let all = tags(&["one", "two", "three", "four", "five"]);
        let no_links = links(&[]);

        let source = SourceSignals { keywords: &kw, tags: &all, links: &no_links };
        let candidate = CandidateSignals { name: "X", keywords: &kw, tags: &all };

        let sim = score(&source, &candidate, &ScoringConfig::default());
        assert_eq!(sim.score, 25);
        assert_eq!(sim.reasons[0].to_string(), "5 shared tags: one, two, three");
    }

    #[test]
    fn test_already_linked_only_once() {
        let kw_a = extract_keywords("planning roadmap milestones", 30);
        let kw_b = extract_keywords("roadmap milestones", 30);
        let shared = tags(&["project"]);
        let source_links = links(&["Roadmap", "Other"]);

        let source = SourceSignals { keywords: &kw_a, tags: &shared, links: &source_links };
        let candidate = CandidateSignals { name: "Roadmap", keywords: &kw_b, tags: &shared };

        let sim = score(&source, &candidate, &ScoringConfig::default());
        assert_eq!(sim.score, 2 * 2 + 5 + 10);
        let linked = sim
            .reasons
            .iter()
            .filter(|r| **r == Reason::AlreadyLinked)
            .count();
        assert_eq!(linked, 1);
        assert_eq!(sim.reasons.last().map(|r| r.to_string()).as_deref(), Some("Already linked"));
    }

    #[test]
    fn test_link_alone_is_enough() {
        let kw = KeywordProfile::default();
        let empty: Vec<String> = Vec::new();
        let source_links = links(&["Lonely"]);

        let source = SourceSignals { keywords: &kw, tags: &empty, links: &source_links };
        let candidate = CandidateSignals { name: "Lonely", keywords: &kw, tags: &empty };

        let sim = score(&source, &candidate, &ScoringConfig::default());
        assert_eq!(sim.score, 10);
        assert_eq!(sim.reasons, vec![Reason::AlreadyLinked]);
    }

    #[test]
    fn test_custom_weights() {
        let kw_a = extract_keywords("alpha bravo", 30);
        let kw_b = extract_keywords("alpha bravo", 30);
        let empty: Vec<String> = Vec::new();
        let no_links = links(&[]);
        let weights = ScoringConfig {
            keyword_weight: 3,
            ..ScoringConfig::default()
        };

        let source = SourceSignals { keywords: &kw_a, tags: &empty, links: &no_links };
        let candidate = CandidateSignals { name: "B", keywords: &kw_b, tags: &empty };

        assert_eq!(score(&source, &candidate, &weights).score, 6);
    }

    #[test]
    fn test_huge_weights_saturate() {
        let kw = extract_keywords("alpha bravo charlie delta", 30);
        let shared = tags(&["big"]);
        let source_links = links(&["B"]);
        let weights = ScoringConfig {
            keyword_weight: 2_000_000_000,
            link_bonus: u32::MAX,
            ..ScoringConfig::default()
        };

        let source = SourceSignals { keywords: &kw, tags: &shared, links: &source_links };
        let candidate = CandidateSignals { name: "B", keywords: &kw, tags: &shared };

        let sim = score(&source, &candidate, &weights);
        assert_eq!(sim.score, u32::MAX);
        assert_eq!(sim.reasons.len(), 3);
    }

    #[test]
    fn test_reason_serializes_as_text() {
        let reasons = vec![
            Reason::SharedKeywords(3),
            Reason::SharedTags { count: 1, sample: vec!["rust".to_string()] },
            Reason::AlreadyLinked,
        ];
        let json = serde_json::to_string(&reasons).unwrap();
        assert_eq!(json, r#"["3 shared keywords","1 shared tags: rust","Already linked"]"#);
    }
}
