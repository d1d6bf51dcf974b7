//! Best-effort extraction from spec-site HTML.
//!
//! Markup differs between pages and sites, so nothing here fails: rows and
//! anchors that do not fit are skipped, and a document with nothing usable
//! yields an empty result. Transport failures are reported by the transport,
//! never by an empty sheet.

use crate::types::{SearchHit, SpecSheet};
use scraper::{ElementRef, Html, Node, Selector};

/// How suggestion anchors are picked out of a search results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionRule {
    /// Anchors matched by a CSS selector, e.g. `div.makers a`.
    Container(String),
    /// Any `a[href]` whose target contains the marker, e.g. `/phones/`.
    HrefMarker(String),
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text nodes are concatenated as-is (`cm<sup>2</sup>` reads `cm2`); only
/// `<br>` introduces a break.
fn element_text(element: &ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(el) if el.name() == "br" => raw.push(' '),
            _ => {}
        }
    }
    collapse_whitespace(&raw)
}

/// Direct `td`/`th` children; cells of nested tables are not counted.
fn row_cells<'a>(row: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .collect()
}

/// Every `<tr>` with exactly two cells becomes `key → value`, in document order.
/// An empty first cell is still a row and keys the value under `""`.
pub fn extract_specs(html: &str) -> SpecSheet {
    let mut sheet = SpecSheet::new();
    if html.trim().is_empty() {
        return sheet;
    }

    let document = Html::parse_document(html);
    let Ok(row_selector) = Selector::parse("tr") else {
        return sheet;
    };

    for row in document.select(&row_selector) {
        let cells = row_cells(row);
        let [key_cell, value_cell] = cells.as_slice() else {
            continue;
        };
        sheet.insert(element_text(key_cell), element_text(value_cell));
    }

    sheet
}

/// Suggestion anchors as `(display text, href)` pairs in document order.
pub fn search_suggestions(html: &str, rule: &SuggestionRule) -> Vec<SearchHit> {
    if html.trim().is_empty() {
        return Vec::new();
    }

    let document = Html::parse_document(html);
    let (selector, marker) = match rule {
        SuggestionRule::Container(css) => (css.as_str(), None),
        SuggestionRule::HrefMarker(marker) => ("a[href]", Some(marker.as_str())),
    };
    let Ok(selector) = Selector::parse(selector) else {
        tracing::warn!("Invalid suggestion selector {:?}", rule);
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?.trim();
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                return None;
            }
            if let Some(marker) = marker {
                if !href.contains(marker) {
                    return None;
                }
            }
            let display_name = element_text(&anchor);
            if display_name.is_empty() {
                return None;
            }
            Some(SearchHit {
                display_name,
                resource_locator: href.to_string(),
            })
        })
        .collect()
}
