use pulse_core::RunReport;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("normalization error for {url}: {reason}")]
    Normalization { url: String, reason: String },

    #[error("invalid source url \"{url}\": {reason}")]
    InvalidSourceUrl { url: String, reason: String },
}

impl IngestError {
    /// Transient conditions worth retrying: network-level failures, 429s,
    /// and 5xx responses. Schema problems and other 4xx statuses are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            IngestError::Http(_) | IngestError::RateLimited { .. } => true,
            IngestError::UnexpectedStatus { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

/// Run-level failure: zero sources configured, or every source failed.
///
/// Carries the finalized report so the caller can still persist and display
/// per-source detail.
#[derive(Debug, Error)]
#[error("pipeline run failed: {reason}")]
pub struct RunError {
    pub reason: String,
    pub report: RunReport,
}
