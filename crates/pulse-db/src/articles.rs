//! Database operations for the `articles` table.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use pulse_core::Article;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `articles` table.
///
/// `categories` and the sentiment/status columns are stored as text; the
/// canonical enums live in `pulse-core` and are rendered with `as_str` on
/// the way in.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub source_id: String,
    pub url: String,
    pub title: String,
    pub body_text: String,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    pub content_fingerprint: String,
    pub categories: Vec<String>,
    pub sentiment_score: f32,
    pub sentiment_label: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const ARTICLE_COLUMNS: &str = "id, source_id, url, title, body_text, published_at, fetched_at, \
     content_fingerprint, categories, sentiment_score, sentiment_label, status, \
     created_at, updated_at";

/// Which of `fingerprints` already exist in storage.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn lookup_fingerprints(
    pool: &PgPool,
    fingerprints: &[String],
) -> Result<HashSet<String>, DbError> {
    if fingerprints.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT content_fingerprint FROM articles WHERE content_fingerprint = ANY($1)",
    )
    .bind(fingerprints)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(fp,)| fp).collect())
}

/// Stored fingerprint per URL for one source. URLs never stored are absent
/// from the map.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn lookup_url_fingerprints(
    pool: &PgPool,
    source_id: &str,
    urls: &[String],
) -> Result<HashMap<String, String>, DbError> {
    if urls.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT url, content_fingerprint FROM articles WHERE source_id = $1 AND url = ANY($2)",
    )
    .bind(source_id)
    .bind(urls)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Upserts an article row, conflicting on `(source_id, url)`.
///
/// Conflicts update everything the pipeline recomputes per run and bump
/// `updated_at`; `created_at` is preserved.
///
/// Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_article(pool: &PgPool, article: &Article) -> Result<i64, DbError> {
    let categories: Vec<String> = article
        .categories
        .iter()
        .map(|c| c.as_str().to_string())
        .collect();

    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO articles \
             (source_id, url, title, body_text, published_at, fetched_at, \
              content_fingerprint, categories, sentiment_score, sentiment_label, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT (source_id, url) DO UPDATE SET \
             title               = EXCLUDED.title, \
             body_text           = EXCLUDED.body_text, \
             published_at        = EXCLUDED.published_at, \
             fetched_at          = EXCLUDED.fetched_at, \
             content_fingerprint = EXCLUDED.content_fingerprint, \
             categories          = EXCLUDED.categories, \
             sentiment_score     = EXCLUDED.sentiment_score, \
             sentiment_label     = EXCLUDED.sentiment_label, \
             status              = EXCLUDED.status, \
             updated_at          = NOW() \
         RETURNING id",
    )
    .bind(&article.source_id)
    .bind(&article.url)
    .bind(&article.title)
    .bind(&article.body_text)
    .bind(article.published_at)
    .bind(article.fetched_at)
    .bind(&article.content_fingerprint)
    .bind(&categories)
    .bind(article.sentiment_score)
    .bind(article.sentiment_label.as_str())
    .bind(article.status.as_str())
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Total stored articles.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_articles(pool: &PgPool) -> Result<i64, DbError> {
    let count: i64 = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM articles")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// The most recently fetched `limit` articles, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_articles(pool: &PgPool, limit: i64) -> Result<Vec<ArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, ArticleRow>(&format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles ORDER BY fetched_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
