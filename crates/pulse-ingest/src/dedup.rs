//! Deduplication against the current run and prior runs.
//!
//! The run-scoped fingerprint set is owned by the run coordinator, shared by
//! concurrent source workers, and dropped when the run ends. Historical
//! fingerprints come from the storage collaborator, batched per source;
//! there is deliberately no process-wide cache across invocations.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use pulse_core::{Article, ArticleStatus};

/// Fingerprints observed so far in this run, shared across source workers.
///
/// `check_and_insert` is a single atomic operation so two workers processing
/// the same content concurrently cannot both classify it as new.
#[derive(Debug, Clone, Default)]
pub struct RunFingerprintSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl RunFingerprintSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `fingerprint` and reports whether this was its first
    /// observation in the current run.
    pub fn check_and_insert(&self, fingerprint: &str) -> bool {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(fingerprint.to_string())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classify a normalized article against the run set and historical lookups.
///
/// - `duplicate`: fingerprint already seen, earlier in this run or ever
///   before. Within a run the first item processed wins as `new`; processing
///   order is the stable source order, then fetch order within a source.
/// - `updated`: URL matches a stored article whose fingerprint differs (the
///   source edited the piece).
/// - `new`: everything else.
///
/// The fingerprint is committed to the run set as part of classification, so
/// later items in the same run observe earlier ones.
pub fn classify_candidate(
    run_set: &RunFingerprintSet,
    historical_fingerprints: &HashSet<String>,
    historical_urls: &HashMap<String, String>,
    article: &Article,
) -> ArticleStatus {
    let first_in_run = run_set.check_and_insert(&article.content_fingerprint);

    if !first_in_run || historical_fingerprints.contains(&article.content_fingerprint) {
        return ArticleStatus::Duplicate;
    }

    match historical_urls.get(&article.url) {
        Some(stored_fingerprint) if *stored_fingerprint != article.content_fingerprint => {
            ArticleStatus::Updated
        }
        // Same URL with the same fingerprint is caught by the set above;
        // an unseen URL with an unseen fingerprint is new.
        _ => ArticleStatus::New,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pulse_core::SentimentLabel;

    fn article(url: &str, fingerprint: &str) -> Article {
        Article {
            source_id: "world-news".to_string(),
            url: url.to_string(),
            title: "Title".to_string(),
            body_text: "Body".to_string(),
            published_at: None,
            fetched_at: Utc::now(),
            content_fingerprint: fingerprint.to_string(),
            categories: Vec::new(),
            sentiment_score: 0.0,
            sentiment_label: SentimentLabel::Neutral,
            status: ArticleStatus::New,
        }
    }

    #[test]
    fn unseen_fingerprint_is_new() {
        let run_set = RunFingerprintSet::new();
        let status = classify_candidate(
            &run_set,
            &HashSet::new(),
            &HashMap::new(),
            &article("https://n.example.org/a", "fp1"),
        );
        assert_eq!(status, ArticleStatus::New);
        assert_eq!(run_set.len(), 1);
    }

    #[test]
    fn first_wins_second_is_duplicate() {
        let run_set = RunFingerprintSet::new();
        let first = classify_candidate(
            &run_set,
            &HashSet::new(),
            &HashMap::new(),
            &article("https://n.example.org/a", "fp1"),
        );
        let second = classify_candidate(
            &run_set,
            &HashSet::new(),
            &HashMap::new(),
            &article("https://m.example.org/b", "fp1"),
        );
        assert_eq!(first, ArticleStatus::New);
        assert_eq!(second, ArticleStatus::Duplicate);
    }

    #[test]
    fn historical_fingerprint_is_duplicate() {
        let run_set = RunFingerprintSet::new();
        let historical: HashSet<String> = ["fp1".to_string()].into();
        let status = classify_candidate(
            &run_set,
            &historical,
            &HashMap::new(),
            &article("https://n.example.org/a", "fp1"),
        );
        assert_eq!(status, ArticleStatus::Duplicate);
    }

    #[test]
    fn known_url_with_changed_fingerprint_is_updated() {
        let run_set = RunFingerprintSet::new();
        let urls: HashMap<String, String> =
            [("https://n.example.org/a".to_string(), "fp-old".to_string())].into();
        let status = classify_candidate(
            &run_set,
            &HashSet::new(),
            &urls,
            &article("https://n.example.org/a", "fp-new"),
        );
        assert_eq!(status, ArticleStatus::Updated);
    }

    #[test]
    fn known_url_with_same_fingerprint_is_duplicate() {
        let run_set = RunFingerprintSet::new();
        let historical: HashSet<String> = ["fp1".to_string()].into();
        let urls: HashMap<String, String> =
            [("https://n.example.org/a".to_string(), "fp1".to_string())].into();
        let status = classify_candidate(
            &run_set,
            &historical,
            &urls,
            &article("https://n.example.org/a", "fp1"),
        );
        assert_eq!(status, ArticleStatus::Duplicate);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_check_and_insert_admits_exactly_one() {
        let run_set = RunFingerprintSet::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let set = run_set.clone();
            handles.push(tokio::spawn(async move { set.check_and_insert("fp-race") }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "exactly one worker may observe the fingerprint first");
        assert_eq!(run_set.len(), 1);
    }
}
