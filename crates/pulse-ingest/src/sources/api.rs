//! JSON API adapter.
//!
//! Expects the endpoint to return `{ "articles": [...] }` where each element
//! carries `title`, `url`, an optional `content`/`description`/`body` field,
//! and an optional `published_at` timestamp.

use chrono::Utc;
use serde::Deserialize;

use pulse_core::SourceConfig;

use crate::client::FetchClient;
use crate::error::IngestError;
use crate::types::{FetchOutcome, RawItem};

#[derive(Debug, Deserialize)]
struct ApiFeed {
    articles: Vec<ApiArticle>,
}

#[derive(Debug, Deserialize)]
struct ApiArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default, alias = "description", alias = "body")]
    content: String,
    #[serde(default)]
    published_at: Option<String>,
}

pub(super) async fn fetch(
    client: &FetchClient,
    config: &SourceConfig,
    max_items: usize,
) -> Result<FetchOutcome, IngestError> {
    let body = client.get_text(&config.url).await?;

    let feed: ApiFeed =
        serde_json::from_str(&body).map_err(|source| IngestError::Deserialize {
            context: format!("article feed for source '{}'", config.id),
            source,
        })?;

    let items = feed
        .articles
        .into_iter()
        .take(max_items)
        .map(|a| RawItem {
            source_id: config.id.clone(),
            fetched_at: Utc::now(),
            url: a.url,
            title: a.title,
            body: a.content,
            published_raw: a.published_at,
        })
        .collect();

    Ok(FetchOutcome::from_items(items))
}
