//! Document snapshots and the markdown parsing that produces them:
//! YAML front-matter and outgoing links.

use regex::Regex;
use serde::Serialize;
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("valid regex"));
static MARKDOWN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));
pub(crate) static FENCED_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

/// Handle to a document in a store: its path and display name.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub path: String,
    pub name: String,
}

impl DocumentRef {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = display_name(&path);
        Self { path, name }
    }
}

/// Front-matter of a note.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// De-duplicated, in front-matter order
    pub tags: Vec<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub note_type: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl Metadata {
    /// Parse the leading `---` block of `content`.
    ///
    /// Content without front-matter yields empty metadata. Only malformed
    /// YAML is an error.
    pub fn from_markdown(content: &str) -> Result<Self, serde_yaml::Error> {
        match split_front_matter(content) {
            Some((yaml, _)) => Self::from_yaml(yaml),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_str(yaml)?;
        let Value::Mapping(mapping) = value else {
            return Ok(Self::default());
        };

        let mut metadata = Self::default();
        for (key, value) in mapping {
            let Some(key) = scalar_to_string(&key) else {
                continue;
            };
            match key.as_str() {
                "tags" => metadata.tags = parse_tags(&value),
                "type" => metadata.note_type = scalar_to_string(&value),
                _ => {
                    metadata.extra.insert(key, value);
                }
            }
        }
        Ok(metadata)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// An immutable snapshot of one document, as read from a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: String,
    pub name: String,
    pub content: String,
    pub metadata: Metadata,
    /// Display names of link targets
    pub links: HashSet<String>,
}

impl Document {
    /// Build a snapshot from raw markdown, parsing front-matter and links.
    ///
    /// Malformed front-matter degrades to empty metadata.
    pub fn from_markdown(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let content = content.into();
        let metadata = Metadata::from_markdown(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path, error = %e, "ignoring malformed front-matter");
            Metadata::default()
        });
        let links = extract_links(&content);
        let name = display_name(&path);

        Self {
            path,
            name,
            content,
            metadata,
            links,
        }
    }

    pub fn doc_ref(&self) -> DocumentRef {
        DocumentRef {
            path: self.path.clone(),
            name: self.name.clone(),
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.metadata.tags
    }

    /// Content after the front-matter block, which is what keywords come from.
    pub fn body(&self) -> &str {
        split_front_matter(&self.content)
            .map(|(_, body)| body)
            .unwrap_or(self.content.as_str())
    }
}

/// File stem of a path, used as the note's display name.
pub fn display_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

/// Split content into (front-matter yaml, body). `None` when the content
/// does not open with a `---` line closed by another `---` line.
pub fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Outgoing link targets of a note, by display name.
///
/// Covers `[[wikilinks]]` and markdown links to local `.md` files. Links
/// inside fenced code blocks are ignored.
pub fn extract_links(content: &str) -> HashSet<String> {
    let text = FENCED_CODE_RE.replace_all(content, "");
    let mut links = HashSet::new();

    for caps in WIKILINK_RE.captures_iter(&text) {
        if let Some(name) = normalize_wikilink(&caps[1]) {
            links.insert(name);
        }
    }

    for caps in MARKDOWN_LINK_RE.captures_iter(&text) {
        if let Some(name) = normalize_markdown_target(&caps[2]) {
            links.insert(name);
        }
    }

    links
}

/// `[[folder/Note#Heading|Alias]]` -> `Note`
fn normalize_wikilink(inner: &str) -> Option<String> {
    let target = inner.split('|').next().unwrap_or(inner);
    let target = target.split('#').next().unwrap_or(target);
    let target = target.rsplit('/').next().unwrap_or(target);
    let target = target.strip_suffix(".md").unwrap_or(target).trim();

    (!target.is_empty()).then(|| target.to_string())
}

/// `../folder/My%20Note.md#part` -> `My Note`; external URLs yield `None`
fn normalize_markdown_target(target: &str) -> Option<String> {
    if target.contains("://") || target.starts_with("mailto:") {
        return None;
    }
    let target = target.split('#').next().unwrap_or(target);
    if !target.ends_with(".md") {
        return None;
    }
    let decoded = target.replace("%20", " ");
    let name = display_name(&decoded);

    (!name.trim().is_empty()).then(|| name.trim().to_string())
}

fn parse_tags(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        other => scalar_to_string(other).into_iter().collect(),
    };

    let mut tags: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let tag = tag.trim().trim_start_matches('#').trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
