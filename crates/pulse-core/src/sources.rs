use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Category, ConfigError};

/// Fetch strategy for a source. Adding a new source type means adding a
/// variant here and an adapter in the ingest crate; shared pipeline logic
/// never branches on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// RSS/Atom syndication feed.
    Rss,
    /// HTML listing page; article links are extracted and fetched.
    Html,
    /// JSON API endpoint returning an article array.
    Api,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Rss => write!(f, "rss"),
            SourceKind::Html => write!(f, "html"),
            SourceKind::Api => write!(f, "api"),
        }
    }
}

/// Static per-source descriptor, immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub kind: SourceKind,
    pub url: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Cap on items taken from this source per run.
    pub max_items: Option<usize>,
    /// Overrides the global delay between follow-up fetches (HTML sources).
    pub inter_request_delay_ms: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
    /// Optional ordered subset of the taxonomy the classifier may assign.
    /// Must include `general` when present. Defaults to the full taxonomy.
    pub taxonomy: Option<Vec<Category>>,
}

impl SourcesFile {
    /// The ordered category set active for this configuration.
    #[must_use]
    pub fn active_taxonomy(&self) -> Vec<Category> {
        self.taxonomy
            .clone()
            .unwrap_or_else(|| Category::ALL.to_vec())
    }

    /// Sources with `enabled: true`, in file order.
    #[must_use]
    pub fn enabled_sources(&self) -> Vec<SourceConfig> {
        self.sources.iter().filter(|s| s.enabled).cloned().collect()
    }
}

/// Load and validate the source list from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation (duplicate ids, bad URLs, malformed taxonomy).
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sources_file: SourcesFile = serde_yaml::from_str(&content)?;
    validate_sources(&sources_file)?;

    Ok(sources_file)
}

fn validate_sources(file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for source in &file.sources {
        if source.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source id must be non-empty".to_string(),
            ));
        }

        if !seen_ids.insert(source.id.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source id: '{}'",
                source.id
            )));
        }

        if !source.url.starts_with("http://") && !source.url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "source '{}' has non-absolute url '{}'",
                source.id, source.url
            )));
        }

        if source.max_items == Some(0) {
            return Err(ConfigError::Validation(format!(
                "source '{}' has max_items 0; omit the field instead",
                source.id
            )));
        }
    }

    if let Some(taxonomy) = &file.taxonomy {
        if taxonomy.is_empty() {
            return Err(ConfigError::Validation(
                "taxonomy must be non-empty when present".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for category in taxonomy {
            if !seen.insert(*category) {
                return Err(ConfigError::Validation(format!(
                    "duplicate taxonomy entry: '{category}'"
                )));
            }
        }
        if !taxonomy.contains(&Category::General) {
            return Err(ConfigError::Validation(
                "taxonomy must include 'general' (classifier fallback)".to_string(),
            ));
        }
    }

    Ok(())
}
