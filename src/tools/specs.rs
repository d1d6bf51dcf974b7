use crate::core::config::ScoutConfig;
use crate::core::error::TransportError;
use crate::scraping::spec_extractor::{self, SuggestionRule};
use crate::scraping::transport::FetchProfile;
use crate::types::{resolve_locator, SearchHit, SpecSheet};
use crate::ScoutContext;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Search page layout of a spec site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStyle {
    /// `/res.php3?sSearch=…`, hits inside `div.makers`.
    GsmArena,
    /// `/search?k=…`, hits are links under `/phones/`.
    PhoneArena,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSite {
    pub base: String,
    pub style: SearchStyle,
}

impl SpecSite {
    pub fn new(base: impl Into<String>, style: SearchStyle) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            style,
        }
    }

    pub fn from_config(config: &ScoutConfig) -> Self {
        let style = match config.resolve_spec_site_style().as_str() {
            "phonearena" => SearchStyle::PhoneArena,
            _ => SearchStyle::GsmArena,
        };
        Self::new(config.resolve_spec_site_base(), style)
    }

    pub fn search_url(&self, query: &str) -> Result<String> {
        let (path, param) = match self.style {
            SearchStyle::GsmArena => ("/res.php3", "sSearch"),
            SearchStyle::PhoneArena => ("/search", "k"),
        };
        let mut url = url::Url::parse(&format!("{}{}", self.base, path))
            .map_err(|e| anyhow!("Invalid spec site base {}: {}", self.base, e))?;
        url.query_pairs_mut().append_pair(param, query.trim());
        Ok(url.to_string())
    }

    pub fn suggestion_rule(&self) -> SuggestionRule {
        match self.style {
            SearchStyle::GsmArena => SuggestionRule::Container("div.makers a".to_string()),
            SearchStyle::PhoneArena => SuggestionRule::HrefMarker("/phones/".to_string()),
        }
    }
}

/// Outcome of a search-then-extract lookup. `hit == None` means nothing matched.
#[derive(Debug, Clone, Serialize, Default)]
pub struct SpecLookup {
    pub query: String,
    pub hit: Option<SearchHit>,
    pub specs: SpecSheet,
}

/// Suggestion search, cached for the spec TTL.
///
/// A failed fetch is logged and returns an empty list; the failure is not
/// cached so the next call tries the network again.
pub async fn search(ctx: &ScoutContext, query: &str) -> Vec<SearchHit> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let url = match ctx.spec_site.search_url(query) {
        Ok(url) => url,
        Err(e) => {
            warn!("{}", e);
            return Vec::new();
        }
    };

    let rule = ctx.spec_site.suggestion_rule();
    let transport = ctx.transport.clone();
    let fetch_url = url.clone();
    let result = ctx
        .search_cache
        .try_get_or_compute(&url, ctx.config.resolve_spec_cache_ttl(), async move {
            let response = transport.fetch(&fetch_url, FetchProfile::Scrape).await?;
            Ok::<_, TransportError>(spec_extractor::search_suggestions(&response.body, &rule))
        })
        .await;

    match result {
        Ok(hits) => {
            info!("Search {:?}: {} hits", query, hits.len());
            hits
        }
        Err(e) => {
            warn!("Search {:?} failed: {}", query, e);
            Vec::new()
        }
    }
}

/// Spec sheet for one locator, cached for the spec TTL.
///
/// `Err` means the page could not be fetched; an empty sheet means it was
/// fetched but held no two-cell rows.
pub async fn spec_sheet(ctx: &ScoutContext, locator: &str) -> Result<SpecSheet, TransportError> {
    let url = resolve_locator(&ctx.spec_site.base, locator);
    let transport = ctx.transport.clone();
    let fetch_url = url.clone();

    ctx.spec_cache
        .try_get_or_compute(&url, ctx.config.resolve_spec_cache_ttl(), async move {
            let response = transport.fetch(&fetch_url, FetchProfile::Scrape).await?;
            Ok::<_, TransportError>(spec_extractor::extract_specs(&response.body))
        })
        .await
        .map_err(|e| e.as_ref().clone())
}

/// Search, take the first hit, extract its sheet.
/// Fetch failures degrade to an empty lookup.
pub async fn lookup(ctx: &ScoutContext, query: &str) -> SpecLookup {
    let mut lookup = SpecLookup {
        query: query.trim().to_string(),
        ..Default::default()
    };

    let Some(first) = search(ctx, query).await.into_iter().next() else {
        info!("No spec hits for {:?}", query);
        return lookup;
    };

    match spec_sheet(ctx, &first.resource_locator).await {
        Ok(sheet) => lookup.specs = sheet,
        Err(e) => warn!("Spec page for {:?} unavailable: {}", first.display_name, e),
    }
    lookup.hit = Some(first);
    lookup
}

/// Write `sheet` as indented JSON to `{dir}/{sanitized name}.json`.
pub async fn save_spec_sheet(dir: &Path, display_name: &str, sheet: &SpecSheet) -> Result<PathBuf> {
    let stem = crate::types::sanitize_display_name(display_name);
    if stem.is_empty() {
        return Err(anyhow!("Cannot derive a file name from {:?}", display_name));
    }

    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow!("Failed to create {}: {}", dir.display(), e))?;
    }

    let path = dir.join(format!("{}.json", stem));
    let payload = serde_json::to_string_pretty(sheet)?;
    tokio::fs::write(&path, payload)
        .await
        .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))?;

    info!("Saved {} spec rows to {}", sheet.len(), path.display());
    Ok(path)
}
