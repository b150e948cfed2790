//! Document stores: where the notes being analyzed come from.

use crate::config::ScanConfig;
use crate::document::{extract_links, Document, DocumentRef, Metadata};
use crate::error::StoreError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Read access to a collection of notes.
pub trait DocumentStore {
    fn list_documents(&self) -> Result<Vec<DocumentRef>, StoreError>;

    fn read_content(&self, doc: &DocumentRef) -> Result<String, StoreError>;

    fn read_metadata(&self, doc: &DocumentRef) -> Result<Metadata, StoreError>;

    fn read_outgoing_links(&self, doc: &DocumentRef) -> Result<HashSet<String>, StoreError>;

    /// Find a document by path, tolerating `./` prefixes and a missing
    /// extension, then by display name.
    fn resolve(&self, path: &str) -> Result<Option<DocumentRef>, StoreError> {
        Ok(self.resolve_among(&self.list_documents()?, path))
    }

    /// Like [`DocumentStore::resolve`], against an already fetched listing.
    fn resolve_among(&self, docs: &[DocumentRef], path: &str) -> Option<DocumentRef> {
        resolve_in(docs, path)
    }

    /// Read everything the analyzer needs about one document.
    fn snapshot(&self, doc: &DocumentRef) -> Result<Document, StoreError> {
        Ok(Document {
            path: doc.path.clone(),
            name: doc.name.clone(),
            content: self.read_content(doc)?,
            metadata: self.read_metadata(doc)?,
            links: self.read_outgoing_links(doc)?,
        })
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").to_string()
}

fn resolve_in(docs: &[DocumentRef], path: &str) -> Option<DocumentRef> {
    let wanted = normalize_path(path);
    let stem = wanted.strip_suffix(".md").unwrap_or(wanted.as_str());

    docs.iter()
        .find(|d| d.path == wanted)
        .or_else(|| docs.iter().find(|d| d.path.strip_suffix(".md") == Some(stem)))
        .or_else(|| docs.iter().find(|d| d.name == stem))
        .cloned()
}

/// A vault on disk: every matching file under a root directory.
pub struct VaultStore {
    root: PathBuf,
    extensions: HashSet<String>,
    exclude: GlobSet,
}

impl VaultStore {
    pub fn open(root: &Path, config: &ScanConfig) -> Result<Self, StoreError> {
        let root = root.canonicalize().map_err(|source| StoreError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let extensions = config
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .collect();

        let mut globs = GlobSetBuilder::new();
        for pattern in &config.exclude {
            globs.add(Glob::new(pattern)?);
        }

        Ok(Self {
            root,
            extensions,
            exclude: globs.build()?,
        })
    }

    fn absolute(&self, doc: &DocumentRef) -> PathBuf {
        self.root.join(&doc.path)
    }

    fn read(&self, doc: &DocumentRef) -> Result<String, StoreError> {
        let path = self.absolute(doc);
        fs::read_to_string(&path).map_err(|source| StoreError::Io { path, source })
    }

    /// Vault-relative, `/`-separated form of a path on disk
    fn relative(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.root)
            .ok()
            .map(|rel| rel.to_string_lossy().replace('\\', "/"))
    }
}

impl DocumentStore for VaultStore {
    fn list_documents(&self) -> Result<Vec<DocumentRef>, StoreError> {
        let mut builder = WalkBuilder::new(&self.root);
        builder.hidden(true).git_ignore(true).git_global(true);

        let mut docs = Vec::new();
        for entry in builder.build() {
            let entry = entry?;
            let path = entry.path();

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            if !self.extensions.contains(&ext) {
                continue;
            }

            let Some(rel_path) = self.relative(path) else {
                continue;
            };
            if self.exclude.is_match(&rel_path) {
                tracing::trace!(path = %rel_path, "excluded");
                continue;
            }

            docs.push(DocumentRef::new(rel_path));
        }

        docs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(docs)
    }

    fn read_content(&self, doc: &DocumentRef) -> Result<String, StoreError> {
        self.read(doc)
    }

    fn read_metadata(&self, doc: &DocumentRef) -> Result<Metadata, StoreError> {
        Ok(self.snapshot(doc)?.metadata)
    }

    fn read_outgoing_links(&self, doc: &DocumentRef) -> Result<HashSet<String>, StoreError> {
        Ok(extract_links(&self.read(doc)?))
    }

    /// Paths that exist relative to the working directory are mapped into
    /// the vault first, so `notes/a.md` works with `--vault notes`.
    fn resolve_among(&self, docs: &[DocumentRef], path: &str) -> Option<DocumentRef> {
        if let Some(rel) = Path::new(path)
            .canonicalize()
            .ok()
            .and_then(|abs| self.relative(&abs))
        {
            if let Some(doc) = docs.iter().find(|d| d.path == rel) {
                return Some(doc.clone());
            }
        }

        resolve_in(docs, path)
    }

    fn snapshot(&self, doc: &DocumentRef) -> Result<Document, StoreError> {
        let content = self.read(doc)?;
        Ok(Document::from_markdown(doc.path.clone(), content))
    }
}

/// Notes held in memory, listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Vec<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a note from raw markdown; a note at the same path is replaced.
    pub fn add(&mut self, path: &str, content: &str) -> &mut Self {
        self.insert(Document::from_markdown(path, content))
    }

    pub fn insert(&mut self, doc: Document) -> &mut Self {
        match self.documents.iter_mut().find(|d| d.path == doc.path) {
            Some(existing) => *existing = doc,
            None => self.documents.push(doc),
        }
        self
    }

    pub fn remove(&mut self, path: &str) -> Option<Document> {
        let index = self.documents.iter().position(|d| d.path == path)?;
        Some(self.documents.remove(index))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn get(&self, doc: &DocumentRef) -> Result<&Document, StoreError> {
        self.documents
            .iter()
            .find(|d| d.path == doc.path)
            .ok_or_else(|| StoreError::UnknownDocument(doc.path.clone()))
    }
}

impl FromIterator<Document> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        let mut store = Self::new();
        for doc in iter {
            store.insert(doc);
        }
        store
    }
}

impl DocumentStore for MemoryStore {
    fn list_documents(&self) -> Result<Vec<DocumentRef>, StoreError> {
        Ok(self.documents.iter().map(Document::doc_ref).collect())
    }

    fn read_content(&self, doc: &DocumentRef) -> Result<String, StoreError> {
        Ok(self.get(doc)?.content.clone())
    }

    fn read_metadata(&self, doc: &DocumentRef) -> Result<Metadata, StoreError> {
        Ok(self.get(doc)?.metadata.clone())
    }

    fn read_outgoing_links(&self, doc: &DocumentRef) -> Result<HashSet<String>, StoreError> {
        Ok(self.get(doc)?.links.clone())
    }

    fn snapshot(&self, doc: &DocumentRef) -> Result<Document, StoreError> {
        self.get(doc).cloned()
    }
}
