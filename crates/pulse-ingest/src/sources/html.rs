//! HTML listing-page adapter.
//!
//! Fetches a listing page, extracts headline-looking article links, then
//! fetches each article page for its title and body paragraphs. Per-item
//! fetch failures are counted and skipped; a streak of transient failures
//! stops the source early, keeping whatever was already collected.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;

use pulse_core::SourceConfig;

use crate::client::FetchClient;
use crate::error::IngestError;
use crate::normalize::{resolve_url, strip_markup};
use crate::types::{FetchOutcome, RawItem};

/// Anchors with fewer words than this are treated as navigation, not
/// headlines.
const MIN_HEADLINE_WORDS: usize = 4;

/// Consecutive transient item failures before the source gives up early.
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

pub(super) async fn fetch(
    client: &FetchClient,
    config: &SourceConfig,
    max_items: usize,
    item_delay_ms: u64,
) -> Result<FetchOutcome, IngestError> {
    let listing = client.get_text(&config.url).await?;
    let links = extract_headline_links(&listing, &config.url);

    if links.is_empty() {
        return Err(IngestError::Normalization {
            url: config.url.clone(),
            reason: "no article links found on listing page".to_string(),
        });
    }

    let mut outcome = FetchOutcome::default();
    let mut consecutive_failures = 0u32;

    for (url, anchor_text) in links.into_iter().take(max_items) {
        if item_delay_ms > 0 && !outcome.items.is_empty() {
            tokio::time::sleep(Duration::from_millis(item_delay_ms)).await;
        }

        match client.get_text(&url).await {
            Ok(page) => {
                consecutive_failures = 0;
                let title = extract_title(&page).unwrap_or(anchor_text);
                outcome.items.push(RawItem {
                    source_id: config.id.clone(),
                    fetched_at: Utc::now(),
                    url,
                    title,
                    body: extract_paragraphs(&page),
                    published_raw: None,
                });
            }
            Err(e) => {
                outcome.item_failures += 1;
                tracing::warn!(
                    source = %config.id,
                    url = %url,
                    error = %e,
                    "article fetch failed, skipping item"
                );
                if e.is_transient() {
                    consecutive_failures += 1;
                    if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                        tracing::warn!(
                            source = %config.id,
                            collected = outcome.items.len(),
                            "stopping source early after repeated transient failures"
                        );
                        break;
                    }
                } else {
                    consecutive_failures = 0;
                }
            }
        }
    }

    Ok(outcome)
}

/// Extract `(absolute_url, anchor_text)` pairs that look like article
/// headlines, deduplicated by URL in page order.
pub(super) fn extract_headline_links(html: &str, base: &str) -> Vec<(String, String)> {
    let re = Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#)
        .expect("valid anchor regex");

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for cap in re.captures_iter(html) {
        let href = cap.get(1).map_or("", |m| m.as_str()).trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("mailto:")
            || href.starts_with("javascript:")
        {
            continue;
        }

        let text = strip_markup(cap.get(2).map_or("", |m| m.as_str()));
        if text.split_whitespace().count() < MIN_HEADLINE_WORDS {
            continue;
        }

        let Some(url) = resolve_url(href, base) else {
            continue;
        };
        if seen.insert(url.clone()) {
            links.push((url, text));
        }
    }

    links
}

/// Article title: `og:title` meta, then `<h1>`, then `<title>`.
pub(super) fn extract_title(html: &str) -> Option<String> {
    let og = Regex::new(
        r#"(?is)<meta[^>]+property\s*=\s*["']og:title["'][^>]+content\s*=\s*["'](.*?)["'][^>]*>"#,
    )
    .expect("valid og:title regex");
    if let Some(cap) = og.captures(html) {
        let title = strip_markup(cap.get(1).map_or("", |m| m.as_str()));
        if !title.is_empty() {
            return Some(title);
        }
    }

    for pattern in [r"(?is)<h1[^>]*>(.*?)</h1>", r"(?is)<title[^>]*>(.*?)</title>"] {
        let re = Regex::new(pattern).expect("valid title regex");
        if let Some(cap) = re.captures(html) {
            let title = strip_markup(cap.get(1).map_or("", |m| m.as_str()));
            if !title.is_empty() {
                return Some(title);
            }
        }
    }

    None
}

/// Concatenated `<p>` contents, markup included; the normalizer strips it.
pub(super) fn extract_paragraphs(html: &str) -> String {
    let re = Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("valid paragraph regex");
    let parts: Vec<&str> = re
        .captures_iter(html)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
        .collect();
    parts.join(" ")
}
