//! Run reporting types.
//!
//! A [`RunReport`] is created by the run coordinator once per invocation,
//! finalized when the last source completes (or the deadline hits), and then
//! immutable. The storage crate persists it; the CLI prints it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall outcome of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Every attempted source succeeded.
    Succeeded,
    /// At least one source failed, but at least one succeeded.
    Degraded,
    /// No source succeeded, or no sources were configured.
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Degraded => "degraded",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-source result of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub source_id: String,
    /// Raw items yielded by the adapter, including ones later dropped.
    pub fetched: u32,
    pub new: u32,
    pub duplicate: u32,
    pub updated: u32,
    /// Items dropped before dedup: normalization failures and per-item
    /// fetch failures inside the adapter.
    pub dropped: u32,
    /// Enriched articles the store rejected on upsert.
    pub upsert_failed: u32,
    /// Set when the source failed outright (fetch error after retries, or
    /// abandoned at the run deadline). Partial counts above are still valid.
    pub error: Option<String>,
}

impl SourceOutcome {
    #[must_use]
    pub fn empty(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            fetched: 0,
            new: 0,
            duplicate: 0,
            updated: 0,
            dropped: 0,
            upsert_failed: 0,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(source_id: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(source_id)
        }
    }

    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Immutable summary of one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub sources: Vec<SourceOutcome>,
    pub status: RunStatus,
}

impl RunReport {
    /// Finalize a report from per-source outcomes.
    ///
    /// Status rules: zero sources or zero successes is `Failed`; any failure
    /// alongside a success is `Degraded`; otherwise `Succeeded`.
    #[must_use]
    pub fn finalize(started_at: DateTime<Utc>, sources: Vec<SourceOutcome>) -> Self {
        let succeeded = sources.iter().filter(|s| s.succeeded()).count();
        let status = if sources.is_empty() || succeeded == 0 {
            RunStatus::Failed
        } else if succeeded < sources.len() {
            RunStatus::Degraded
        } else {
            RunStatus::Succeeded
        };

        Self {
            started_at,
            completed_at: Utc::now(),
            sources,
            status,
        }
    }

    #[must_use]
    pub fn total_fetched(&self) -> u32 {
        self.sources.iter().map(|s| s.fetched).sum()
    }

    #[must_use]
    pub fn total_new(&self) -> u32 {
        self.sources.iter().map(|s| s.new).sum()
    }

    #[must_use]
    pub fn total_duplicate(&self) -> u32 {
        self.sources.iter().map(|s| s.duplicate).sum()
    }

    #[must_use]
    pub fn total_updated(&self) -> u32 {
        self.sources.iter().map(|s| s.updated).sum()
    }
}
