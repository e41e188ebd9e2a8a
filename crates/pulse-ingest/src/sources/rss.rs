//! RSS/Atom feed adapter.
//!
//! Parses `<item>` (RSS 2.0) and `<entry>` (Atom) elements with quick-xml,
//! pulling title, link, description/summary, and publication timestamp.
//! Markup inside descriptions is left intact; stripping belongs to the
//! normalizer.

use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::Reader;

use pulse_core::SourceConfig;

use crate::client::FetchClient;
use crate::error::IngestError;
use crate::types::{FetchOutcome, RawItem};

pub(super) async fn fetch(
    client: &FetchClient,
    config: &SourceConfig,
    max_items: usize,
) -> Result<FetchOutcome, IngestError> {
    let body = client.get_text(&config.url).await?;

    if !body.contains("<rss") && !body.contains("<feed") {
        return Err(IngestError::Normalization {
            url: config.url.clone(),
            reason: "response is not an RSS or Atom document".to_string(),
        });
    }

    let outcome = parse_feed(&body, &config.id, max_items)?;
    tracing::debug!(
        source = %config.id,
        count = outcome.items.len(),
        failures = outcome.item_failures,
        "parsed feed items"
    );
    Ok(outcome)
}

/// Parse a feed XML body into raw items, stopping after `max_items`.
///
/// Malformed XML mid-stream terminates the parse but keeps every item
/// already collected, counted as one item failure.
///
/// # Errors
///
/// Returns [`IngestError::Xml`] only when the document breaks before a
/// single item was parsed.
pub(super) fn parse_feed(
    xml: &str,
    source_id: &str,
    max_items: usize,
) -> Result<FetchOutcome, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut in_item = false;
    let mut current_tag = String::new();
    let mut title = String::new();
    let mut link = String::new();
    let mut body = String::new();
    let mut published = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name_buf = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_buf).unwrap_or("").to_string();
                if name == "item" || name == "entry" {
                    in_item = true;
                    title.clear();
                    link.clear();
                    body.clear();
                    published.clear();
                } else if in_item && name == "link" {
                    // Atom carries the link as an attribute rather than text.
                    if let Some(href) = attr_value(&e, b"href") {
                        link = href;
                    }
                }
                current_tag = name;
            }
            Ok(Event::Empty(e)) => {
                let name_buf = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_buf).unwrap_or("");
                if in_item && name == "link" && link.is_empty() {
                    if let Some(href) = attr_value(&e, b"href") {
                        link = href;
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name_buf = e.name().as_ref().to_vec();
                let name = std::str::from_utf8(&name_buf).unwrap_or("");
                if (name == "item" || name == "entry") && in_item {
                    in_item = false;
                    if !title.is_empty() && !link.is_empty() {
                        items.push(RawItem {
                            source_id: source_id.to_string(),
                            fetched_at: Utc::now(),
                            url: link.clone(),
                            title: title.clone(),
                            body: body.clone(),
                            published_raw: if published.is_empty() {
                                None
                            } else {
                                Some(published.clone())
                            },
                        });
                        if items.len() >= max_items {
                            break;
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if in_item {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    match current_tag.as_str() {
                        "title" => title = text,
                        "link" => link = text,
                        "description" | "summary" | "content" => {
                            // Descriptions may arrive as several text nodes
                            // split by inline tags.
                            if !body.is_empty() {
                                body.push(' ');
                            }
                            body.push_str(&text);
                        }
                        "pubDate" | "published" | "updated" => {
                            if published.is_empty() {
                                published = text;
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::CData(e)) => {
                if in_item {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    match current_tag.as_str() {
                        "title" => title = text,
                        "description" | "summary" | "content" => body = text,
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                if items.is_empty() {
                    return Err(IngestError::Xml(e));
                }
                tracing::warn!(
                    source = %source_id,
                    collected = items.len(),
                    error = %e,
                    "feed broke mid-stream, keeping items parsed so far"
                );
                return Ok(FetchOutcome {
                    items,
                    item_failures: 1,
                });
            }
            _ => {}
        }
    }

    Ok(FetchOutcome::from_items(items))
}

fn attr_value(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}
