//! notelink - find notes related to a source note in a markdown vault.
//!
//! A scan extracts keywords from every note, scores each candidate against
//! the source by shared keywords, shared tags and existing links, then ranks
//! and buckets the results into a [`Report`]. A tag scan summarizes tag
//! usage across the whole vault into a [`TagReport`].

pub mod analyze;
pub mod config;
pub mod document;
pub mod error;
pub mod keywords;
pub mod report;
pub mod similarity;
pub mod store;
pub mod tags;

pub use analyze::{analyze, scan};
pub use config::Config;
pub use document::{Document, DocumentRef, Metadata};
pub use error::{ConfigError, ScanError, StoreError};
pub use keywords::{extract_keywords, KeywordProfile};
pub use report::{Priority, Report, SimilarityResult};
pub use similarity::{Reason, Similarity};
pub use store::{DocumentStore, MemoryStore, VaultStore};
pub use tags::{analyze_tags, scan_tags, TagReport};
