//! Run coordination: one scheduled invocation across all enabled sources.
//!
//! Sources are fetched with bounded concurrency; within a source, items move
//! sequentially through normalize → dedup → classify → score → upsert. The
//! only mutable state shared between source workers is the run-scoped
//! fingerprint set. A single source failing never aborts the run; the run
//! fails only when no source succeeds.

use std::sync::{Mutex, MutexGuard};

use futures::stream::{self, StreamExt};
use tokio::time::{timeout_at, Duration, Instant};

use pulse_core::{AppConfig, Article, ArticleStatus, Category, RunReport, SourceConfig, SourceOutcome};

use crate::client::FetchClient;
use crate::dedup::{classify_candidate, RunFingerprintSet};
use crate::error::RunError;
use crate::normalize::{normalize, NormalizeLimits};
use crate::sentiment::score_and_label;
use crate::sources::SourceAdapter;
use crate::store::ArticleStore;
use crate::{classify, types::FetchOutcome};

/// Execute one pipeline run over `sources` (already filtered to enabled,
/// in stable configuration order).
///
/// Returns the finalized [`RunReport`]. Partial failure is success: a report
/// with `Degraded` status is still `Ok`.
///
/// # Errors
///
/// Returns [`RunError`] when zero sources are configured or every source
/// failed. The error carries the report so callers can still persist it.
pub async fn run_pipeline<S: ArticleStore + Sync>(
    config: &AppConfig,
    sources: &[SourceConfig],
    taxonomy: &[Category],
    store: &S,
) -> Result<RunReport, RunError> {
    let started_at = chrono::Utc::now();

    if sources.is_empty() {
        return Err(RunError {
            reason: "no sources configured".to_string(),
            report: RunReport::finalize(started_at, Vec::new()),
        });
    }

    let client = match FetchClient::new(
        config.request_timeout_secs,
        &config.user_agent,
        config.per_source_retry_count,
        config.retry_backoff_base_secs,
    ) {
        Ok(client) => client,
        Err(e) => {
            return Err(RunError {
                reason: format!("failed to build HTTP client: {e}"),
                report: RunReport::finalize(started_at, Vec::new()),
            });
        }
    };

    let run_set = RunFingerprintSet::new();
    let deadline = Instant::now() + Duration::from_secs(config.run_timeout_secs);
    let max_concurrent = config.concurrency_limit.max(1);

    let mut indexed: Vec<(usize, SourceOutcome)> = stream::iter(sources.iter().enumerate())
        .map(|(idx, source)| {
            let client = &client;
            let run_set = &run_set;
            async move {
                // Progress lives outside the source future so counts recorded
                // before the deadline survive abandonment.
                let progress = Mutex::new(SourceOutcome::empty(&source.id));
                let outcome = match timeout_at(
                    deadline,
                    process_source(config, source, taxonomy, client, run_set, store, &progress),
                )
                .await
                {
                    Ok(()) => take_progress(progress),
                    Err(_) => {
                        tracing::warn!(source = %source.id, "source abandoned at run deadline");
                        let mut outcome = take_progress(progress);
                        outcome.error = Some("abandoned at run deadline".to_string());
                        outcome
                    }
                };
                (idx, outcome)
            }
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    // Report sources in configuration order regardless of completion order.
    indexed.sort_by_key(|(idx, _)| *idx);
    let outcomes: Vec<SourceOutcome> = indexed.into_iter().map(|(_, o)| o).collect();

    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    if failed > 0 {
        tracing::warn!(
            failed_sources = failed,
            total_sources = outcomes.len(),
            "some sources failed during this run"
        );
    }

    let report = RunReport::finalize(started_at, outcomes);
    tracing::info!(
        status = %report.status,
        fetched = report.total_fetched(),
        new = report.total_new(),
        duplicate = report.total_duplicate(),
        updated = report.total_updated(),
        "pipeline run complete"
    );

    if report.status == pulse_core::RunStatus::Failed {
        return Err(RunError {
            reason: "no sources succeeded".to_string(),
            report,
        });
    }

    Ok(report)
}

fn lock_progress(progress: &Mutex<SourceOutcome>) -> MutexGuard<'_, SourceOutcome> {
    match progress.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn take_progress(progress: Mutex<SourceOutcome>) -> SourceOutcome {
    match progress.into_inner() {
        Ok(outcome) => outcome,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Fetch and enrich one source, absorbing all per-item errors into counts.
///
/// Counts are written to `progress` as soon as each stage establishes them,
/// so a caller that abandons this future mid-flight still observes the work
/// completed up to that point.
async fn process_source<S: ArticleStore + Sync>(
    config: &AppConfig,
    source: &SourceConfig,
    taxonomy: &[Category],
    client: &FetchClient,
    run_set: &RunFingerprintSet,
    store: &S,
    progress: &Mutex<SourceOutcome>,
) {
    let adapter = SourceAdapter::new(source.clone(), config.inter_request_delay_ms);

    let FetchOutcome {
        items,
        item_failures,
    } = match adapter.fetch(client).await {
        Ok(fetched) => fetched,
        Err(e) => {
            tracing::warn!(source = %source.id, error = %e, "source fetch failed");
            lock_progress(progress).error = Some(e.to_string());
            return;
        }
    };

    {
        let mut outcome = lock_progress(progress);
        outcome.fetched = u32::try_from(items.len()).unwrap_or(u32::MAX);
        outcome.dropped = item_failures;
    }

    let limits = NormalizeLimits {
        max_body_chars: config.max_body_chars,
        fingerprint_prefix_chars: config.fingerprint_prefix_chars,
    };

    let mut candidates: Vec<Article> = Vec::with_capacity(items.len());
    for item in items {
        match normalize(item, &source.url, limits) {
            Ok(article) => candidates.push(article),
            Err(e) => {
                lock_progress(progress).dropped += 1;
                tracing::warn!(source = %source.id, error = %e, "item dropped in normalization");
            }
        }
    }

    let (historical_fingerprints, historical_urls) =
        historical_lookups(store, &source.id, &candidates).await;

    let mut batch: Vec<Article> = Vec::new();
    for mut article in candidates {
        let status = classify_candidate(run_set, &historical_fingerprints, &historical_urls, &article);
        match status {
            ArticleStatus::Duplicate => {
                lock_progress(progress).duplicate += 1;
            }
            ArticleStatus::New | ArticleStatus::Updated => {
                article.status = status;
                article.categories = classify::classify(&article.title, &article.body_text, taxonomy);
                let (score, label) = score_and_label(&article.body_text);
                article.sentiment_score = score;
                article.sentiment_label = label;

                if status == ArticleStatus::New {
                    lock_progress(progress).new += 1;
                } else {
                    lock_progress(progress).updated += 1;
                }
                batch.push(article);
            }
        }
    }

    if !batch.is_empty() {
        match store.upsert_articles(&batch).await {
            Ok(failures) => {
                lock_progress(progress).upsert_failed =
                    u32::try_from(failures.len()).unwrap_or(u32::MAX);
                for failure in failures {
                    tracing::warn!(
                        source = %source.id,
                        url = %failure.url,
                        reason = %failure.reason,
                        "article upsert rejected"
                    );
                }
            }
            Err(e) => {
                lock_progress(progress).upsert_failed = u32::try_from(batch.len()).unwrap_or(u32::MAX);
                tracing::warn!(source = %source.id, error = %e, "article batch upsert failed");
            }
        }
    }

    let outcome = lock_progress(progress);
    tracing::debug!(
        source = %source.id,
        fetched = outcome.fetched,
        new = outcome.new,
        duplicate = outcome.duplicate,
        updated = outcome.updated,
        dropped = outcome.dropped,
        "source processed"
    );
}

/// Batched historical lookups for one source's candidates.
///
/// Lookup failures degrade to "assume none known" so the run completes;
/// the trade is possible duplicate storage, not lost availability.
async fn historical_lookups<S: ArticleStore + Sync>(
    store: &S,
    source_id: &str,
    candidates: &[Article],
) -> (
    std::collections::HashSet<String>,
    std::collections::HashMap<String, String>,
) {
    let fingerprints: Vec<String> = candidates
        .iter()
        .map(|a| a.content_fingerprint.clone())
        .collect();
    let urls: Vec<String> = candidates.iter().map(|a| a.url.clone()).collect();

    let historical_fingerprints = match store.lookup_fingerprints(&fingerprints).await {
        Ok(known) => known,
        Err(e) => {
            tracing::warn!(
                source = %source_id,
                error = %e,
                "fingerprint lookup failed, assuming none known"
            );
            std::collections::HashSet::new()
        }
    };

    let historical_urls = match store.lookup_url_fingerprints(source_id, &urls).await {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(
                source = %source_id,
                error = %e,
                "url lookup failed, update detection disabled for this batch"
            );
            std::collections::HashMap::new()
        }
    };

    (historical_fingerprints, historical_urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError, UpsertFailure};
    use pulse_core::{Environment, RunStatus, SourceKind};
    use std::collections::{HashMap, HashSet};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(concurrency_limit: usize) -> AppConfig {
        AppConfig {
            env: Environment::Test,
            log_level: "info".to_string(),
            sources_path: "./config/sources.yaml".into(),
            concurrency_limit,
            per_source_retry_count: 0,
            retry_backoff_base_secs: 0,
            request_timeout_secs: 5,
            run_timeout_secs: 30,
            user_agent: "livepulse-test/0.1".to_string(),
            max_body_chars: 10_000,
            fingerprint_prefix_chars: 2048,
            inter_request_delay_ms: 0,
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 10,
        }
    }

    fn rss_source(id: &str, url: String) -> SourceConfig {
        SourceConfig {
            id: id.to_string(),
            kind: SourceKind::Rss,
            url,
            enabled: true,
            max_items: None,
            inter_request_delay_ms: None,
        }
    }

    fn feed_xml(items: &[(&str, &str, &str)]) -> String {
        let mut xml = String::from(r#"<?xml version="1.0"?><rss version="2.0"><channel>"#);
        for (title, url, body) in items {
            xml.push_str(&format!(
                "<item><title>{title}</title><link>{url}</link><description>{body}</description></item>"
            ));
        }
        xml.push_str("</channel></rss>");
        xml
    }

    async fn mount_feed(server: &MockServer, feed_path: &str, items: &[(&str, &str, &str)]) {
        Mock::given(method("GET"))
            .and(path(feed_path.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed_xml(items)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn first_run_stores_new_articles() {
        let server = MockServer::start().await;
        mount_feed(
            &server,
            "/feed",
            &[
                ("Markets rally on earnings", "https://n.example.org/a", "Stocks rose."),
                ("Wildfire spreads north", "https://n.example.org/b", "Crews deployed."),
            ],
        )
        .await;

        let store = MemoryStore::new();
        let config = test_config(4);
        let sources = vec![rss_source("world", format!("{}/feed", server.uri()))];

        let report = run_pipeline(&config, &sources, Category::ALL, &store)
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Succeeded);
        assert_eq!(report.total_fetched(), 2);
        assert_eq!(report.total_new(), 2);
        assert_eq!(report.total_duplicate(), 0);
        assert_eq!(store.len(), 2);

        let stored = store.articles();
        assert!(stored.iter().all(|a| !a.categories.is_empty()));
        assert!(stored
            .iter()
            .all(|a| (-1.0..=1.0).contains(&a.sentiment_score)));
    }

    #[tokio::test]
    async fn second_identical_run_yields_only_duplicates() {
        let server = MockServer::start().await;
        mount_feed(
            &server,
            "/feed",
            &[
                ("Markets rally on earnings", "https://n.example.org/a", "Stocks rose."),
                ("Wildfire spreads north", "https://n.example.org/b", "Crews deployed."),
            ],
        )
        .await;

        let store = MemoryStore::new();
        let config = test_config(4);
        let sources = vec![rss_source("world", format!("{}/feed", server.uri()))];

        run_pipeline(&config, &sources, Category::ALL, &store)
            .await
            .unwrap();
        let second = run_pipeline(&config, &sources, Category::ALL, &store)
            .await
            .unwrap();

        assert_eq!(second.total_new(), 0);
        assert_eq!(second.total_duplicate(), 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn same_content_across_sources_dedupes_first_wins() {
        let server = MockServer::start().await;
        mount_feed(
            &server,
            "/first",
            &[("Shared wire story", "https://a.example.org/story", "Same text.")],
        )
        .await;
        mount_feed(
            &server,
            "/second",
            &[("Shared wire story", "https://b.example.org/story", "Same text.")],
        )
        .await;

        let store = MemoryStore::new();
        // Sequential processing makes the winner deterministic.
        let config = test_config(1);
        let sources = vec![
            rss_source("alpha", format!("{}/first", server.uri())),
            rss_source("beta", format!("{}/second", server.uri())),
        ];

        let report = run_pipeline(&config, &sources, Category::ALL, &store)
            .await
            .unwrap();

        assert_eq!(report.sources[0].new, 1);
        assert_eq!(report.sources[1].new, 0);
        assert_eq!(report.sources[1].duplicate, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn edited_article_is_updated() {
        let server = MockServer::start().await;
        mount_feed(
            &server,
            "/v1",
            &[("Council vote tonight", "https://n.example.org/council", "Vote at nine.")],
        )
        .await;
        mount_feed(
            &server,
            "/v2",
            &[("Council vote tonight", "https://n.example.org/council", "Vote postponed.")],
        )
        .await;

        let store = MemoryStore::new();
        let config = test_config(4);

        run_pipeline(
            &config,
            &[rss_source("city", format!("{}/v1", server.uri()))],
            Category::ALL,
            &store,
        )
        .await
        .unwrap();

        let second = run_pipeline(
            &config,
            &[rss_source("city", format!("{}/v2", server.uri()))],
            Category::ALL,
            &store,
        )
        .await
        .unwrap();

        assert_eq!(second.total_updated(), 1);
        assert_eq!(second.total_new(), 0);
        let stored = store.articles();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, ArticleStatus::Updated);
        assert_eq!(stored[0].body_text, "Vote postponed.");
    }

    #[tokio::test]
    async fn one_failing_source_degrades_but_completes() {
        let server = MockServer::start().await;
        for i in 0..4 {
            let url = format!("https://n.example.org/ok{i}");
            let body = format!("Body {i}");
            mount_feed(
                &server,
                &format!("/ok{i}"),
                &[("Steady headline", url.as_str(), body.as_str())],
            )
            .await;
        }
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        let config = test_config(4);
        let mut sources: Vec<SourceConfig> = (0..4)
            .map(|i| rss_source(&format!("ok{i}"), format!("{}/ok{i}", server.uri())))
            .collect();
        sources.push(rss_source("broken", format!("{}/broken", server.uri())));

        let report = run_pipeline(&config, &sources, Category::ALL, &store)
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Degraded);
        let broken = report
            .sources
            .iter()
            .find(|o| o.source_id == "broken")
            .unwrap();
        assert!(broken.error.as_deref().unwrap().contains("500"));
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn all_sources_failing_is_a_run_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        let config = test_config(4);
        let sources = vec![rss_source("broken", format!("{}/broken", server.uri()))];

        let err = run_pipeline(&config, &sources, Category::ALL, &store)
            .await
            .unwrap_err();
        assert!(err.reason.contains("no sources succeeded"));
        assert_eq!(err.report.status, RunStatus::Failed);
        assert_eq!(err.report.sources.len(), 1);
    }

    #[tokio::test]
    async fn zero_sources_is_a_run_error() {
        let store = MemoryStore::new();
        let config = test_config(4);
        let err = run_pipeline(&config, &[], Category::ALL, &store)
            .await
            .unwrap_err();
        assert!(err.reason.contains("no sources configured"));
    }

    #[tokio::test]
    async fn concurrency_level_does_not_change_new_set() {
        let server = MockServer::start().await;
        mount_feed(
            &server,
            "/a",
            &[
                ("Alpha story one", "https://a.example.org/1", "Text one."),
                ("Shared wire story", "https://a.example.org/2", "Same text."),
            ],
        )
        .await;
        mount_feed(
            &server,
            "/b",
            &[("Shared wire story", "https://b.example.org/1", "Same text.")],
        )
        .await;
        mount_feed(
            &server,
            "/c",
            &[("Gamma story one", "https://c.example.org/1", "Text three.")],
        )
        .await;

        let sources = |base: &str| {
            vec![
                rss_source("a", format!("{base}/a")),
                rss_source("b", format!("{base}/b")),
                rss_source("c", format!("{base}/c")),
            ]
        };

        let store_seq = MemoryStore::new();
        run_pipeline(&test_config(1), &sources(&server.uri()), Category::ALL, &store_seq)
            .await
            .unwrap();

        let store_par = MemoryStore::new();
        run_pipeline(&test_config(8), &sources(&server.uri()), Category::ALL, &store_par)
            .await
            .unwrap();

        let fingerprints = |store: &MemoryStore| -> HashSet<String> {
            store
                .articles()
                .into_iter()
                .map(|a| a.content_fingerprint)
                .collect()
        };
        assert_eq!(fingerprints(&store_seq), fingerprints(&store_par));
        assert_eq!(store_seq.len(), 3);
    }

    #[tokio::test]
    async fn slow_source_is_abandoned_at_deadline() {
        let server = MockServer::start().await;
        mount_feed(
            &server,
            "/fast",
            &[("Quick story today", "https://n.example.org/fast", "Body.")],
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(feed_xml(&[]))
                    .set_delay(std::time::Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let store = MemoryStore::new();
        let mut config = test_config(4);
        config.run_timeout_secs = 1;
        let sources = vec![
            rss_source("fast", format!("{}/fast", server.uri())),
            rss_source("slow", format!("{}/slow", server.uri())),
        ];

        let report = run_pipeline(&config, &sources, Category::ALL, &store)
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Degraded);
        let slow = report.sources.iter().find(|o| o.source_id == "slow").unwrap();
        assert!(slow.error.as_deref().unwrap().contains("deadline"));
        assert_eq!(store.len(), 1);
    }

    /// Store whose upsert never completes, stalling the source at the last
    /// stage so the run deadline hits first.
    struct StallingStore;

    impl ArticleStore for StallingStore {
        async fn lookup_fingerprints(
            &self,
            _fingerprints: &[String],
        ) -> Result<HashSet<String>, StoreError> {
            Ok(HashSet::new())
        }

        async fn lookup_url_fingerprints(
            &self,
            _source_id: &str,
            _urls: &[String],
        ) -> Result<HashMap<String, String>, StoreError> {
            Ok(HashMap::new())
        }

        async fn upsert_articles(
            &self,
            _articles: &[Article],
        ) -> Result<Vec<UpsertFailure>, StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn abandoned_source_keeps_counts_recorded_before_deadline() {
        let server = MockServer::start().await;
        mount_feed(
            &server,
            "/feed",
            &[
                ("Markets rally on earnings", "https://n.example.org/a", "Stocks rose."),
                ("Wildfire spreads north", "https://n.example.org/b", "Crews deployed."),
            ],
        )
        .await;

        let mut config = test_config(4);
        config.run_timeout_secs = 1;
        let sources = vec![rss_source("world", format!("{}/feed", server.uri()))];

        let err = run_pipeline(&config, &sources, Category::ALL, &StallingStore)
            .await
            .unwrap_err();

        let outcome = &err.report.sources[0];
        assert!(outcome.error.as_deref().unwrap().contains("deadline"));
        assert_eq!(outcome.fetched, 2, "fetch finished before the stall");
        assert_eq!(outcome.new, 2, "classification finished before the stall");
    }

    // Store wrappers for degradation paths.

    struct FailingLookupStore {
        inner: MemoryStore,
    }

    impl ArticleStore for FailingLookupStore {
        async fn lookup_fingerprints(
            &self,
            _fingerprints: &[String],
        ) -> Result<HashSet<String>, StoreError> {
            Err(StoreError("lookup unavailable".to_string()))
        }

        async fn lookup_url_fingerprints(
            &self,
            _source_id: &str,
            _urls: &[String],
        ) -> Result<HashMap<String, String>, StoreError> {
            Err(StoreError("lookup unavailable".to_string()))
        }

        async fn upsert_articles(
            &self,
            articles: &[Article],
        ) -> Result<Vec<UpsertFailure>, StoreError> {
            self.inner.upsert_articles(articles).await
        }
    }

    #[tokio::test]
    async fn lookup_failure_degrades_to_assume_none_known() {
        let server = MockServer::start().await;
        mount_feed(
            &server,
            "/feed",
            &[("Some headline here", "https://n.example.org/a", "Body.")],
        )
        .await;

        let store = FailingLookupStore {
            inner: MemoryStore::new(),
        };
        let config = test_config(4);
        let sources = vec![rss_source("world", format!("{}/feed", server.uri()))];

        let report = run_pipeline(&config, &sources, Category::ALL, &store)
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Succeeded);
        assert_eq!(report.total_new(), 1);
        assert_eq!(store.inner.len(), 1);
    }

    struct RejectingUpsertStore;

    impl ArticleStore for RejectingUpsertStore {
        async fn lookup_fingerprints(
            &self,
            _fingerprints: &[String],
        ) -> Result<HashSet<String>, StoreError> {
            Ok(HashSet::new())
        }

        async fn lookup_url_fingerprints(
            &self,
            _source_id: &str,
            _urls: &[String],
        ) -> Result<HashMap<String, String>, StoreError> {
            Ok(HashMap::new())
        }

        async fn upsert_articles(
            &self,
            articles: &[Article],
        ) -> Result<Vec<UpsertFailure>, StoreError> {
            Ok(articles
                .iter()
                .map(|a| UpsertFailure {
                    url: a.url.clone(),
                    reason: "constraint violation".to_string(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn upsert_rejections_are_counted_not_fatal() {
        let server = MockServer::start().await;
        mount_feed(
            &server,
            "/feed",
            &[("Some headline here", "https://n.example.org/a", "Body.")],
        )
        .await;

        let config = test_config(4);
        let sources = vec![rss_source("world", format!("{}/feed", server.uri()))];

        let report = run_pipeline(&config, &sources, Category::ALL, &RejectingUpsertStore)
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Succeeded);
        assert_eq!(report.sources[0].upsert_failed, 1);
    }
}
