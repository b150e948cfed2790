use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk vault: {0}")]
    Walk(#[from] ignore::Error),

    #[error("invalid exclude pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("document not in store: {0}")]
    UnknownDocument(String),
}

/// A scan either produces a full report or fails as a whole.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("document not found in vault: {0}")]
    SourceNotFound(String),

    #[error("could not list documents: {0}")]
    List(#[source] StoreError),

    #[error("scan aborted while reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
