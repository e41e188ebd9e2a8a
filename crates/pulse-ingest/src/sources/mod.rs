//! Source adapters.
//!
//! One adapter variant per [`SourceKind`]; the pipeline calls
//! [`SourceAdapter::fetch`] and never branches on the kind anywhere else.
//! Adding a source type means adding a module here and a `SourceKind`
//! variant in the core crate.

mod api;
mod html;
mod rss;

use pulse_core::{SourceConfig, SourceKind};

use crate::client::FetchClient;
use crate::error::IngestError;
use crate::types::FetchOutcome;

/// Default per-source item cap when the config does not set `max_items`.
const DEFAULT_MAX_ITEMS: usize = 50;

/// Fetches raw items for one configured source. Holds no state between runs;
/// every invocation fetches fresh.
pub struct SourceAdapter {
    config: SourceConfig,
    /// Delay between follow-up item fetches, for adapters that make them.
    item_delay_ms: u64,
}

impl SourceAdapter {
    #[must_use]
    pub fn new(config: SourceConfig, default_item_delay_ms: u64) -> Self {
        let item_delay_ms = config
            .inter_request_delay_ms
            .unwrap_or(default_item_delay_ms);
        Self {
            config,
            item_delay_ms,
        }
    }

    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.config.id
    }

    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.config.url
    }

    /// Fetch the current batch of raw items for this source.
    ///
    /// Partial success is possible: the outcome may carry items alongside a
    /// nonzero `item_failures` count when individual follow-up fetches
    /// failed. A returned error means the source yielded nothing usable.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] when the primary fetch fails after retries or
    /// the payload cannot be interpreted at all.
    pub async fn fetch(&self, client: &FetchClient) -> Result<FetchOutcome, IngestError> {
        let max_items = self.config.max_items.unwrap_or(DEFAULT_MAX_ITEMS);
        match self.config.kind {
            SourceKind::Rss => rss::fetch(client, &self.config, max_items).await,
            SourceKind::Html => {
                html::fetch(client, &self.config, max_items, self.item_delay_ms).await
            }
            SourceKind::Api => api::fetch(client, &self.config, max_items).await,
        }
    }
}
