//! Related-note scans: one source document against a corpus.

use crate::config::Config;
use crate::document::Document;
use crate::error::ScanError;
use crate::keywords::extract_keywords;
use crate::report::{build_report, Report, SimilarityResult};
use crate::similarity::{score, CandidateSignals, SourceSignals};
use crate::store::DocumentStore;
use std::time::Instant;

/// Score every corpus document against `source` and build the report.
///
/// The corpus may include the source itself; it is skipped by path.
pub fn analyze(source: &Document, corpus: &[Document], config: &Config) -> Report {
    let max_keywords = config.scoring.max_keywords;
    let source_keywords = extract_keywords(source.body(), max_keywords);
    let source_signals = SourceSignals {
        keywords: &source_keywords,
        tags: source.tags(),
        links: &source.links,
    };

    let mut results = Vec::new();
    for doc in corpus {
        if doc.path == source.path {
            continue;
        }

        let keywords = extract_keywords(doc.body(), max_keywords);
        let candidate = CandidateSignals {
            name: &doc.name,
            keywords: &keywords,
            tags: doc.tags(),
        };

        let similarity = score(&source_signals, &candidate, &config.scoring);
        tracing::debug!(candidate = %doc.path, score = similarity.score, "scored");

        if similarity.is_related() {
            results.push(SimilarityResult {
                candidate: doc.doc_ref(),
                score: similarity.score,
                reasons: similarity.reasons,
                tags: doc.metadata.tags.clone(),
                note_type: doc
                    .metadata
                    .note_type
                    .clone()
                    .unwrap_or_else(|| "note".to_string()),
            });
        }
    }

    build_report(source.doc_ref(), results, &config.report)
}

/// Read `source_path` and every document in `store`, then analyze.
///
/// Any read failure aborts the scan; there are no partial reports.
pub fn scan<S: DocumentStore + ?Sized>(
    store: &S,
    source_path: &str,
    config: &Config,
) -> Result<Report, ScanError> {
    let start = Instant::now();

    let refs = store.list_documents().map_err(ScanError::List)?;
    let source_ref = store
        .resolve_among(&refs, source_path)
        .ok_or_else(|| ScanError::SourceNotFound(source_path.to_string()))?;
    let source = store
        .snapshot(&source_ref)
        .map_err(|source| ScanError::Read {
            path: source_ref.path.clone(),
            source,
        })?;

    let mut corpus = Vec::with_capacity(refs.len());
    for doc_ref in &refs {
        if doc_ref.path == source.path {
            continue;
        }
        let doc = store.snapshot(doc_ref).map_err(|e| ScanError::Read {
            path: doc_ref.path.clone(),
            source: e,
        })?;
        corpus.push(doc);
    }

    let report = analyze(&source, &corpus, config);
    tracing::info!(
        source = %source.path,
        scanned = corpus.len(),
        related = report.total_related,
        elapsed = ?start.elapsed(),
        "scan complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentRef, Metadata};
    use crate::error::StoreError;
    use crate::report::Priority;
    use crate::store::MemoryStore;
    use std::cell::Cell;
    use std::collections::HashSet;

    /// Wraps a store and fails reads of one path.
    struct FailingStore {
        inner: MemoryStore,
        broken: &'static str,
    }

    impl FailingStore {
        fn check(&self, doc: &DocumentRef) -> Result<(), StoreError> {
            if doc.path == self.broken {
                return Err(StoreError::Io {
                    path: self.broken.into(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                });
            }
            Ok(())
        }
    }

    impl DocumentStore for FailingStore {
        fn list_documents(&self) -> Result<Vec<DocumentRef>, StoreError> {
            self.inner.list_documents()
        }

        fn read_content(&self, doc: &DocumentRef) -> Result<String, StoreError> {
            self.check(doc)?;
            self.inner.read_content(doc)
        }

        fn read_metadata(&self, doc: &DocumentRef) -> Result<Metadata, StoreError> {
            self.check(doc)?;
            self.inner.read_metadata(doc)
        }

        fn read_outgoing_links(&self, doc: &DocumentRef) -> Result<HashSet<String>, StoreError> {
            self.check(doc)?;
            self.inner.read_outgoing_links(doc)
        }
    }

    /// Counts how often the listing is requested.
    struct CountingStore {
        inner: MemoryStore,
        listings: Cell<usize>,
    }

    impl DocumentStore for CountingStore {
        fn list_documents(&self) -> Result<Vec<DocumentRef>, StoreError> {
            self.listings.set(self.listings.get() + 1);
            self.inner.list_documents()
        }

        fn read_content(&self, doc: &DocumentRef) -> Result<String, StoreError> {
            self.inner.read_content(doc)
        }

        fn read_metadata(&self, doc: &DocumentRef) -> Result<Metadata, StoreError> {
            self.inner.read_metadata(doc)
        }

        fn read_outgoing_links(&self, doc: &DocumentRef) -> Result<HashSet<String>, StoreError> {
            self.inner.read_outgoing_links(doc)
        }
    }

    fn three_note_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .add(
                "A.md",
                "---\ntags: [garden]\n---\ntomatoes compost tomatoes compost watering",
            )
            .add(
                "B.md",
                "---\ntags: [garden, food]\n---\ntomatoes and compost bins",
            )
            .add("C.md", "---\ntags: [finance]\n---\nquarterly budget spreadsheet");
        store
    }

    #[test]
    fn test_end_to_end_single_match() {
        let store = three_note_store();
        let report = scan(&store, "A.md", &Config::default()).unwrap();

        assert_eq!(report.source.name, "A");
        assert_eq!(report.total_related, 1);
        assert_eq!(report.results.len(), 1);

        let hit = &report.results[0];
        assert_eq!(hit.candidate.name, "B");
        assert_eq!(hit.score, 2 * 2 + 5);
        assert_eq!(hit.note_type, "note");
        assert_eq!(hit.tags, vec!["garden", "food"]);

        let reasons: Vec<String> = hit.reasons.iter().map(|r| r.to_string()).collect();
        assert_eq!(reasons, vec!["2 shared keywords", "1 shared tags: garden"]);

        assert_eq!(
            Priority::classify(hit.score, &Config::default().report),
            Some(Priority::ConsiderLinking)
        );
        assert_eq!(report.buckets.get(Priority::ConsiderLinking).len(), 1);
        assert!(report.buckets.high.is_empty());
        assert!(report.buckets.medium.is_empty());
    }

    #[test]
    fn test_analyze_skips_source_in_corpus() {
        let a = Document::from_markdown("A.md", "identical content words here");
        let b = Document::from_markdown("B.md", "identical content words here");
        let report = analyze(&a, &[a.clone(), b], &Config::default());

        assert_eq!(report.total_related, 1);
        assert_eq!(report.results[0].candidate.path, "B.md");
        // identical, content, words, here
        assert_eq!(report.results[0].score, 8);
    }

    #[test]
    fn test_analyze_link_and_type() {
        let a = Document::from_markdown("A.md", "Read [[Plan]] first");
        let plan = Document::from_markdown("plans/Plan.md", "---\ntype: project\n---\nnothing shared");
        let other = Document::from_markdown("Other.md", "unrelated");

        let report = analyze(&a, &[plan, other], &Config::default());
        assert_eq!(report.total_related, 1);
        let hit = &report.results[0];
        assert_eq!(hit.candidate.name, "Plan");
        assert_eq!(hit.score, 10);
        assert_eq!(hit.note_type, "project");
        assert_eq!(report.buckets.medium.len(), 1);
    }

    #[test]
    fn test_scan_unknown_source() {
        let store = three_note_store();
        let err = scan(&store, "Nope.md", &Config::default()).unwrap_err();
        assert!(matches!(err, ScanError::SourceNotFound(ref p) if p == "Nope.md"));
    }

    #[test]
    fn test_scan_aborts_on_read_failure() {
        let store = FailingStore {
            inner: three_note_store(),
            broken: "C.md",
        };
        let err = scan(&store, "A.md", &Config::default()).unwrap_err();
        match err {
            ScanError::Read { path, source } => {
                assert_eq!(path, "C.md");
                assert!(matches!(source, StoreError::Io { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scan_fails_when_source_unreadable() {
        let store = FailingStore {
            inner: three_note_store(),
            broken: "A.md",
        };
        let err = scan(&store, "A", &Config::default()).unwrap_err();
        assert!(matches!(err, ScanError::Read { ref path, .. } if path == "A.md"));
    }

    #[test]
    fn test_scan_lists_store_once() {
        let store = CountingStore {
            inner: three_note_store(),
            listings: Cell::new(0),
        };
        let report = scan(&store, "A.md", &Config::default()).unwrap();
        assert_eq!(report.total_related, 1);
        assert_eq!(store.listings.get(), 1);
    }
}
