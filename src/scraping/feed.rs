use crate::types::{FeedEntry, Published};
use chrono::DateTime;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

// Item keys that map onto typed FeedEntry fields.
const TYPED_KEYS: &[&str] = &[
    "title",
    "url",
    "link",
    "external_url",
    "date_published",
    "date_modified",
    "published",
    "pubDate",
];

// Nested object RSS-Bridge uses for bridge-specific item fields.
const BRIDGE_EXTRAS_KEY: &str = "_rssbridge";

/// Parse a feed document into entries, keeping source order.
///
/// JSON Feed (RSS-Bridge `format=Json`) is tried first since it is the only
/// format that carries extra per-item fields. RSS and Atom go through
/// `feed-rs`. Anything unreadable yields no entries.
pub fn parse_feed(raw: &str) -> Vec<FeedEntry> {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if trimmed.starts_with('{') {
        return match serde_json::from_str::<Value>(trimmed) {
            Ok(doc) => parse_json_feed(&doc),
            Err(e) => {
                debug!("Feed body looked like JSON but did not parse: {}", e);
                Vec::new()
            }
        };
    }

    match feed_rs::parser::parse(trimmed.as_bytes()) {
        Ok(feed) => feed.entries.into_iter().map(from_xml_entry).collect(),
        Err(e) => {
            debug!("Feed body is not RSS/Atom: {}", e);
            Vec::new()
        }
    }
}

fn parse_json_feed(doc: &Value) -> Vec<FeedEntry> {
    let Some(items) = doc.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .map(from_json_item)
        .collect()
}

fn from_json_item(item: &Map<String, Value>) -> FeedEntry {
    let text = |key: &str| item.get(key).and_then(Value::as_str).map(str::trim);

    let title = text("title").unwrap_or_default().to_string();
    let link = ["url", "link", "external_url"]
        .iter()
        .find_map(|key| text(*key).filter(|s| !s.is_empty()))
        .or_else(|| text("id").filter(|id| id.starts_with("http")))
        .unwrap_or_default()
        .to_string();
    let published = ["date_published", "published", "pubDate", "date_modified"]
        .iter()
        .find_map(|key| item.get(*key).and_then(published_from_json));

    let mut extra_fields = BTreeMap::new();
    for (key, value) in item {
        if TYPED_KEYS.contains(&key.as_str()) {
            continue;
        }
        if key == BRIDGE_EXTRAS_KEY {
            if let Some(nested) = value.as_object() {
                for (nested_key, nested_value) in nested {
                    if let Some(s) = scalar_to_string(nested_value) {
                        extra_fields.insert(nested_key.clone(), s);
                    }
                }
            }
            continue;
        }
        if key == "author" {
            if let Some(name) = value.get("name").and_then(Value::as_str) {
                extra_fields.insert("author".to_string(), name.to_string());
                continue;
            }
        }
        if let Some(s) = scalar_to_string(value) {
            extra_fields.insert(key.clone(), s);
        }
    }

    FeedEntry {
        title,
        link,
        published,
        extra_fields,
    }
}

fn published_from_json(value: &Value) -> Option<Published> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(Published::parse(s)),
        Value::Number(n) => {
            let secs = n.as_i64()?;
            DateTime::from_timestamp(secs, 0).map(|dt| Published::Parsed(dt.fixed_offset()))
        }
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn from_xml_entry(entry: feed_rs::model::Entry) -> FeedEntry {
    let title = entry
        .title
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default();
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();
    let published = entry
        .published
        .or(entry.updated)
        .map(|dt| Published::Parsed(dt.fixed_offset()));

    let mut extra_fields = BTreeMap::new();
    if !entry.id.is_empty() {
        extra_fields.insert("id".to_string(), entry.id);
    }
    if let Some(summary) = entry.summary {
        extra_fields.insert("summary".to_string(), summary.content);
    }
    if let Some(author) = entry.authors.into_iter().next() {
        extra_fields.insert("author".to_string(), author.name);
    }

    FeedEntry {
        title,
        link,
        published,
        extra_fields,
    }
}
