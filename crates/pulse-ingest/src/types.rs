use chrono::{DateTime, Utc};

/// Source-specific fetched payload, consumed by the normalizer and then
/// discarded. Never persisted.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub source_id: String,
    pub fetched_at: DateTime<Utc>,
    /// Link as the source reported it; may be relative to the source URL.
    pub url: String,
    pub title: String,
    /// Raw body or summary markup. HTML stripping happens in normalization.
    pub body: String,
    /// Publication timestamp string as reported (RFC 2822 or RFC 3339).
    pub published_raw: Option<String>,
}

/// Result of one adapter invocation. `item_failures` counts items the
/// adapter skipped on per-item errors while still yielding the rest.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub items: Vec<RawItem>,
    pub item_failures: u32,
}

impl FetchOutcome {
    #[must_use]
    pub fn from_items(items: Vec<RawItem>) -> Self {
        Self {
            items,
            item_failures: 0,
        }
    }
}
