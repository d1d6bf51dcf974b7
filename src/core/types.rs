use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// User-agent plus optional proxy attached to one outbound request attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_agent: String,
    pub proxy_endpoint: Option<String>,
}

/// A successful (HTTP 200) response body together with the identity that fetched it.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub identity: Identity,
}

/// Candidate result from a suggestion search.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub display_name: String,
    /// Relative (`/apple_iphone_16_pro-13315.php`) or absolute target.
    pub resource_locator: String,
}

impl SearchHit {
    /// Resolve the locator against a site base. Absolute locators pass through.
    pub fn resolve(&self, site_base: &str) -> String {
        resolve_locator(site_base, &self.resource_locator)
    }

    /// File stem used when the sheet for this hit is written to disk.
    pub fn artifact_name(&self) -> String {
        sanitize_display_name(&self.display_name)
    }
}

pub fn resolve_locator(site_base: &str, locator: &str) -> String {
    let locator = locator.trim();
    if locator.starts_with("http://") || locator.starts_with("https://") {
        return locator.to_string();
    }
    // Bare bases like `https://host` have no trailing slash; join needs one.
    let base = format!("{}/", site_base.trim_end_matches('/'));
    match url::Url::parse(&base).and_then(|base| base.join(locator)) {
        Ok(joined) => joined.to_string(),
        Err(_) => format!("{}{}", base, locator.trim_start_matches('/')),
    }
}

/// Spaces become underscores; anything that could escape a directory is dropped.
pub fn sanitize_display_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect()
}

/// Ordered attribute → value mapping in table row order.
///
/// Keys are unique: inserting an existing key replaces its value in place, so the
/// row keeps the position where the key first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecSheet {
    rows: Vec<(String, String)>,
}

impl SpecSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.rows.iter_mut().find(|(k, _)| *k == key) {
            Some(row) => row.1 = value,
            None => self.rows.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for SpecSheet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (k, v) in &self.rows {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SpecSheet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut sheet = SpecSheet::new();
        for (k, v) in iter {
            sheet.insert(k, v);
        }
        sheet
    }
}

/// Timestamp of a feed entry.
///
/// Feed sources disagree on formats. Anything we can read becomes `Parsed`;
/// anything else is kept verbatim as `Raw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Parsed(DateTime<FixedOffset>),
    Raw(String),
}

impl Published {
    const NAIVE_FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Published::Parsed(dt);
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
            return Published::Parsed(dt);
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, Self::NAIVE_FORMAT) {
            return Published::Parsed(naive.and_utc().fixed_offset());
        }
        Published::Raw(trimmed.to_string())
    }

    /// Date-only label (`2025-01-31`) for parsed values; raw values are returned whole.
    pub fn date_label(&self) -> String {
        match self {
            Published::Parsed(dt) => dt.format("%Y-%m-%d").to_string(),
            Published::Raw(s) => s.clone(),
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Published::Parsed(dt) => Some(dt),
            Published::Raw(_) => None,
        }
    }
}

impl Serialize for Published {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Published::Parsed(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            Published::Raw(s) => serializer.serialize_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: Option<Published>,
    /// Source-specific attributes (e.g. `amazon_price`, `idealo_price`).
    /// Read them through [`FeedEntry::extra_or`].
    pub extra_fields: BTreeMap<String, String>,
}

impl FeedEntry {
    pub fn extra_or<'a>(&'a self, name: &str, fallback: &'a str) -> &'a str {
        self.extra_fields
            .get(name)
            .map(String::as_str)
            .unwrap_or(fallback)
    }
}
