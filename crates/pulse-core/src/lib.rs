//! Domain types and configuration for the LivePulse news pipeline.
//!
//! Holds the canonical [`Article`] record shared by every pipeline stage,
//! the fixed topic taxonomy, sentiment labels, run reporting types, and the
//! environment/YAML configuration surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod app_config;
mod config;
mod report;
mod sources;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use report::{RunReport, RunStatus, SourceOutcome};
pub use sources::{load_sources, SourceConfig, SourceKind, SourcesFile};

/// Fixed topic taxonomy. Ordered: the classifier emits categories in this
/// order, and `General` is the fallback when no other category matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Politics,
    Business,
    Technology,
    Science,
    Health,
    Sports,
    Entertainment,
    World,
    Environment,
    Crime,
    Education,
    General,
}

impl Category {
    /// All categories in taxonomy order.
    pub const ALL: &'static [Category] = &[
        Category::Politics,
        Category::Business,
        Category::Technology,
        Category::Science,
        Category::Health,
        Category::Sports,
        Category::Entertainment,
        Category::World,
        Category::Environment,
        Category::Crime,
        Category::Education,
        Category::General,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Politics => "politics",
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Science => "science",
            Category::Health => "health",
            Category::Sports => "sports",
            Category::Entertainment => "entertainment",
            Category::World => "world",
            Category::Environment => "environment",
            Category::Crime => "crime",
            Category::Education => "education",
            Category::General => "general",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentiment polarity label derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    /// Map a score in `[-1.0, 1.0]` to a label.
    ///
    /// Thresholds are exclusive: a score of exactly `0.1` or `-0.1` is
    /// `Neutral`.
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score < -0.1 {
            SentimentLabel::Negative
        } else if score > 0.1 {
            SentimentLabel::Positive
        } else {
            SentimentLabel::Neutral
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Positive => "positive",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an article relates to previously observed content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    /// Fingerprint unseen in this run and historically.
    New,
    /// Fingerprint already seen, either earlier in this run or in storage.
    Duplicate,
    /// Same URL as a stored article but a different fingerprint.
    Updated,
}

impl ArticleStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::New => "new",
            ArticleStatus::Duplicate => "duplicate",
            ArticleStatus::Updated => "updated",
        }
    }
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical article record produced by the normalizer and enriched by the
/// classifier and sentiment scorer.
///
/// `content_fingerprint` is a pure function of the normalized title and body
/// prefix; two articles with the same fingerprint are the same content
/// regardless of URL. `(source_id, url)` uniquely identifies an article
/// within a source across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub source_id: String,
    pub url: String,
    pub title: String,
    pub body_text: String,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub content_fingerprint: String,
    pub categories: Vec<Category>,
    pub sentiment_score: f32,
    pub sentiment_label: SentimentLabel,
    pub status: ArticleStatus,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
