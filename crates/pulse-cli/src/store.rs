//! Postgres-backed [`ArticleStore`] used by non-dry runs.

use std::collections::{HashMap, HashSet};

use pulse_core::Article;
use pulse_ingest::{ArticleStore, StoreError, UpsertFailure};
use sqlx::PgPool;

pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ArticleStore for PgStore {
    async fn lookup_fingerprints(
        &self,
        fingerprints: &[String],
    ) -> Result<HashSet<String>, StoreError> {
        pulse_db::lookup_fingerprints(&self.pool, fingerprints)
            .await
            .map_err(|e| StoreError(e.to_string()))
    }

    async fn lookup_url_fingerprints(
        &self,
        source_id: &str,
        urls: &[String],
    ) -> Result<HashMap<String, String>, StoreError> {
        pulse_db::lookup_url_fingerprints(&self.pool, source_id, urls)
            .await
            .map_err(|e| StoreError(e.to_string()))
    }

    async fn upsert_articles(&self, articles: &[Article]) -> Result<Vec<UpsertFailure>, StoreError> {
        // Row-at-a-time so one rejected article does not sink the batch.
        let mut failures = Vec::new();
        for article in articles {
            if let Err(e) = pulse_db::upsert_article(&self.pool, article).await {
                failures.push(UpsertFailure {
                    url: article.url.clone(),
                    reason: e.to_string(),
                });
            }
        }
        Ok(failures)
    }
}
