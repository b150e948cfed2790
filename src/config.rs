//! Runtime configuration, read once from `.notelink.toml`.
//!
//! Every field has a default, so an absent file or an empty table behaves
//! exactly like the built-in weights and thresholds.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub scan: ScanConfig,
    pub scoring: ScoringConfig,
    pub report: ReportConfig,
    pub tags: TagConfig,
}

/// Which files in a vault count as documents.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub extensions: Vec<String>,
    /// Globs matched against vault-relative paths
    pub exclude: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string()],
            exclude: Vec::new(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    pub max_keywords: usize,
    pub keyword_weight: u32,
    pub tag_weight: u32,
    pub link_bonus: u32,
    /// Shared tags quoted in the reason text
    pub shared_tag_sample: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_keywords: 30,
            keyword_weight: 2,
            tag_weight: 5,
            link_bonus: 10,
            shared_tag_sample: 3,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub detail_limit: usize,
    pub high_above: u32,
    pub medium_from: u32,
    pub low_from: u32,
    pub star_step: u32,
    pub max_stars: u32,
    pub tag_table_limit: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            detail_limit: 20,
            high_above: 15,
            medium_from: 10,
            low_from: 5,
            star_step: 5,
            max_stars: 5,
            tag_table_limit: 10,
        }
    }
}

/// Tag analysis knobs.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TagConfig {
    /// Tags used fewer times are dropped before analysis
    pub min_count: usize,
    /// Normalized similarity ratio, 0.0 to 1.0, at which two tags are
    /// reported as near-duplicates
    pub similarity_threshold: f32,
    /// Length of the most and least common lists and of the category list
    pub top: usize,
    pub tags_per_category: usize,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            min_count: 1,
            similarity_threshold: 0.75,
            top: 10,
            tags_per_category: 5,
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.scoring.max_keywords, 30);
        assert_eq!(config.report.detail_limit, 20);
        assert_eq!(config.scan.extensions, vec!["md"]);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::parse(
            r#"
[scan]
exclude = ["_temp/**"]

[scoring]
link_bonus = 12
"#,
        )
        .unwrap();

        assert_eq!(config.scan.exclude, vec!["_temp/**"]);
        assert_eq!(config.scan.extensions, vec!["md"]);
        assert_eq!(config.scoring.link_bonus, 12);
        assert_eq!(config.scoring.tag_weight, 5);
        assert_eq!(config.report, ReportConfig::default());
    }

    #[test]
    fn test_tag_section() {
        let config = Config::parse("[tags]\nmin_count = 2\nsimilarity_threshold = 0.9\n").unwrap();
        assert_eq!(config.tags.min_count, 2);
        assert_eq!(config.tags.similarity_threshold, 0.9);
        assert_eq!(config.tags.top, 10);
        assert_eq!(Config::default().tags.similarity_threshold, 0.75);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Config::parse("[scoring]\nbogus = 1\n").is_err());
        assert!(Config::parse("[nonsense]\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[report\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }
}
