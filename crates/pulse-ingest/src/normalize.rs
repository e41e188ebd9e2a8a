//! Normalization from raw fetched items to canonical [`Article`] records.
//!
//! Pure functions only: no fetching, no clocks beyond what the raw item
//! already carries. The content fingerprint is a SHA-256 over the normalized
//! title plus a bounded prefix of the normalized body, so identical content
//! fingerprints identically regardless of URL.

use chrono::{DateTime, Utc};
use reqwest::Url;
use sha2::{Digest, Sha256};

use pulse_core::{Article, ArticleStatus, SentimentLabel};

use crate::error::IngestError;
use crate::types::RawItem;

#[derive(Debug, Clone, Copy)]
pub struct NormalizeLimits {
    /// Normalized body text is truncated to this many characters.
    pub max_body_chars: usize,
    /// Characters of normalized body hashed into the fingerprint.
    pub fingerprint_prefix_chars: usize,
}

impl Default for NormalizeLimits {
    fn default() -> Self {
        Self {
            max_body_chars: 10_000,
            fingerprint_prefix_chars: 2048,
        }
    }
}

/// Normalize a raw item into a canonical article.
///
/// The returned article carries placeholder enrichment fields (`New` status,
/// empty categories, neutral sentiment); the deduplicator and enrichment
/// stages fill them in exactly once.
///
/// # Errors
///
/// Returns [`IngestError::Normalization`] when the title is empty after
/// markup stripping or the URL cannot be resolved to an absolute form.
pub fn normalize(
    raw: RawItem,
    base_url: &str,
    limits: NormalizeLimits,
) -> Result<Article, IngestError> {
    let title = strip_markup(&raw.title);
    if title.is_empty() {
        return Err(IngestError::Normalization {
            url: raw.url,
            reason: "title is empty after normalization".to_string(),
        });
    }

    if raw.url.trim().is_empty() {
        return Err(IngestError::Normalization {
            url: raw.url,
            reason: "item has no url".to_string(),
        });
    }
    let url = resolve_url(&raw.url, base_url).ok_or_else(|| IngestError::Normalization {
        url: raw.url.clone(),
        reason: "url cannot be resolved to an absolute form".to_string(),
    })?;

    let body_text: String = strip_markup(&raw.body)
        .chars()
        .take(limits.max_body_chars)
        .collect();

    let content_fingerprint =
        compute_fingerprint(&title, &body_text, limits.fingerprint_prefix_chars);

    let published_at = raw.published_raw.as_deref().and_then(parse_published);

    Ok(Article {
        source_id: raw.source_id,
        url,
        title,
        body_text,
        published_at,
        fetched_at: raw.fetched_at,
        content_fingerprint,
        categories: Vec::new(),
        sentiment_score: 0.0,
        sentiment_label: SentimentLabel::Neutral,
        status: ArticleStatus::New,
    })
}

/// Strip HTML tags, decode common entities, and collapse whitespace.
pub(crate) fn strip_markup(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                if in_tag {
                    in_tag = false;
                    // Tag boundaries separate words in the rendered text.
                    out.push(' ');
                }
            }
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    let decoded = decode_entities(&out);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the handful of entities that show up in feed titles and summaries.
fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
}

/// Resolve a possibly-relative URL against a base, dropping any fragment.
pub(crate) fn resolve_url(raw: &str, base: &str) -> Option<String> {
    let mut url = if raw.starts_with("http://") || raw.starts_with("https://") {
        Url::parse(raw).ok()?
    } else {
        Url::parse(base).ok()?.join(raw).ok()?
    };

    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Some(url.to_string())
}

fn compute_fingerprint(title: &str, body: &str, prefix_chars: usize) -> String {
    let body_prefix: String = body.chars().take(prefix_chars).collect();
    let input = format!("{title}\n{body_prefix}");
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Parse a source-reported publication timestamp. Feeds use RFC 2822
/// (`pubDate`), Atom and APIs use RFC 3339. Unparsable values become `None`.
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
