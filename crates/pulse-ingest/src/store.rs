//! Storage collaborator interface.
//!
//! The pipeline only needs three operations from storage: batched
//! fingerprint lookups, URL-to-fingerprint lookups for update detection,
//! and batched article upserts keyed on `(source_id, url)`. Both lookups
//! are treated as potentially slow and failable; the pipeline degrades
//! rather than aborting when they do fail.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use pulse_core::Article;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("storage error: {0}")]
pub struct StoreError(pub String);

/// One article rejected on upsert. Recorded in the run report, never fatal.
#[derive(Debug, Clone)]
pub struct UpsertFailure {
    pub url: String,
    pub reason: String,
}

/// Storage operations consumed by the pipeline.
///
/// Implementations: the Postgres store in the CLI crate and the in-memory
/// store below (dry runs and tests).
#[allow(async_fn_in_trait)]
pub trait ArticleStore {
    /// Which of `fingerprints` the store already holds from prior runs.
    async fn lookup_fingerprints(
        &self,
        fingerprints: &[String],
    ) -> Result<HashSet<String>, StoreError>;

    /// Stored fingerprint per URL for the given source, for update
    /// detection. URLs the store has never seen are absent from the map.
    async fn lookup_url_fingerprints(
        &self,
        source_id: &str,
        urls: &[String],
    ) -> Result<HashMap<String, String>, StoreError>;

    /// Upsert a batch of enriched articles keyed on `(source_id, url)`.
    /// Per-item failures come back in the `Ok` vector; an `Err` means the
    /// whole batch was rejected.
    async fn upsert_articles(&self, articles: &[Article]) -> Result<Vec<UpsertFailure>, StoreError>;
}

/// In-memory store for dry runs and tests. Keeps articles across pipeline
/// invocations within the process, so repeated runs exercise the same
/// duplicate/updated semantics as the database store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Mutex<HashMap<(String, String), Article>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored articles, in no particular order.
    #[must_use]
    pub fn articles(&self) -> Vec<Article> {
        self.lock().values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Article>> {
        match self.articles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ArticleStore for MemoryStore {
    async fn lookup_fingerprints(
        &self,
        fingerprints: &[String],
    ) -> Result<HashSet<String>, StoreError> {
        let stored = self.lock();
        let known: HashSet<String> = stored
            .values()
            .map(|a| a.content_fingerprint.clone())
            .collect();
        Ok(fingerprints
            .iter()
            .filter(|fp| known.contains(*fp))
            .cloned()
            .collect())
    }

    async fn lookup_url_fingerprints(
        &self,
        source_id: &str,
        urls: &[String],
    ) -> Result<HashMap<String, String>, StoreError> {
        let stored = self.lock();
        Ok(urls
            .iter()
            .filter_map(|url| {
                stored
                    .get(&(source_id.to_string(), url.clone()))
                    .map(|a| (url.clone(), a.content_fingerprint.clone()))
            })
            .collect())
    }

    async fn upsert_articles(&self, articles: &[Article]) -> Result<Vec<UpsertFailure>, StoreError> {
        let mut stored = self.lock();
        for article in articles {
            stored.insert(
                (article.source_id.clone(), article.url.clone()),
                article.clone(),
            );
        }
        Ok(Vec::new())
    }
}
