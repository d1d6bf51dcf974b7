use crate::core::error::{ScoutError, TransportError};
use crate::scraping::feed;
use crate::scraping::transport::FetchProfile;
use crate::types::FeedEntry;
use crate::ScoutContext;
use std::fmt;
use tracing::{info, warn};

/// 13-digit GTIN/EAN, checked before any request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gtin(String);

impl Gtin {
    pub fn parse(raw: &str) -> Result<Self, ScoutError> {
        let trimmed = raw.trim();
        if trimmed.len() == 13 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Gtin(trimmed.to_string()))
        } else {
            Err(ScoutError::InvalidGtin(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Gtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One RSS-bridge feed endpoint with its bridge-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeRequest {
    GsmArena,
    Engadget,
    ArsTechnica,
    Amazon { query: String },
    Idealo { gtin: Gtin },
}

impl BridgeRequest {
    /// Build from loosely typed input (HTTP query, CLI args).
    ///
    /// Accepts short names (`amazon`) or bridge names (`AmazonBridge`), any case.
    pub fn from_parts(
        name: &str,
        query: Option<&str>,
        gtin: Option<&str>,
    ) -> Result<Self, ScoutError> {
        let normalized = name.trim().to_ascii_lowercase();
        let short = normalized.strip_suffix("bridge").unwrap_or(&normalized);
        match short {
            "gsmarena" => Ok(BridgeRequest::GsmArena),
            "engadget" => Ok(BridgeRequest::Engadget),
            "arstechnica" => Ok(BridgeRequest::ArsTechnica),
            "amazon" => {
                let query = query
                    .map(str::trim)
                    .filter(|q| !q.is_empty())
                    .ok_or(ScoutError::MissingParam {
                        bridge: "AmazonBridge",
                        param: "q",
                    })?;
                Ok(BridgeRequest::Amazon {
                    query: query.to_string(),
                })
            }
            "idealo" => {
                let raw = gtin.ok_or(ScoutError::MissingParam {
                    bridge: "IdealoBridge",
                    param: "gtin",
                })?;
                Ok(BridgeRequest::Idealo {
                    gtin: Gtin::parse(raw)?,
                })
            }
            _ => Err(ScoutError::UnknownBridge(name.to_string())),
        }
    }

    pub fn bridge_name(&self) -> &'static str {
        match self {
            BridgeRequest::GsmArena => "GSMarenaBridge",
            BridgeRequest::Engadget => "EngadgetBridge",
            BridgeRequest::ArsTechnica => "ArsTechnicaBridge",
            BridgeRequest::Amazon { .. } => "AmazonBridge",
            BridgeRequest::Idealo { .. } => "IdealoBridge",
        }
    }

    /// `{base}/?action=display&bridge={Name}&format=Json[&params]`
    pub fn endpoint_url(&self, bridge_base: &str) -> Result<String, TransportError> {
        let base = format!("{}/", bridge_base.trim_end_matches('/'));
        let mut url = url::Url::parse(&base).map_err(|e| TransportError::InvalidUrl {
            url: base.clone(),
            reason: e.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("action", "display")
                .append_pair("bridge", self.bridge_name())
                .append_pair("format", "Json");
            match self {
                BridgeRequest::Amazon { query } => {
                    pairs.append_pair("q", query);
                }
                BridgeRequest::Idealo { gtin } => {
                    pairs.append_pair("gtin", gtin.as_str());
                }
                _ => {}
            }
        }
        Ok(url.to_string())
    }
}

/// Fetch and parse one bridge feed, cached for the feed TTL.
///
/// `Ok(vec![])` is a reachable bridge with nothing to report; `Err` means the
/// bridge could not be reached within the attempt budget.
pub async fn fetch_feed(
    ctx: &ScoutContext,
    request: &BridgeRequest,
) -> Result<Vec<FeedEntry>, TransportError> {
    let url = request.endpoint_url(&ctx.bridge_base)?;
    let transport = ctx.transport.clone();
    let fetch_url = url.clone();

    let result = ctx
        .feed_cache
        .try_get_or_compute(&url, ctx.config.resolve_feed_cache_ttl(), async move {
            let response = transport.fetch(&fetch_url, FetchProfile::Feed).await?;
            Ok::<_, TransportError>(feed::parse_feed(&response.body))
        })
        .await
        .map_err(|e| e.as_ref().clone());

    match &result {
        Ok(entries) => info!("{}: {} entries", request.bridge_name(), entries.len()),
        Err(e) => warn!("{} unavailable: {}", request.bridge_name(), e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gtin_must_be_thirteen_digits() {
        assert_eq!(Gtin::parse("8806095212349").unwrap().as_str(), "8806095212349");
        assert!(Gtin::parse("12345").is_err());
        assert!(Gtin::parse("880609521234X").is_err());
        assert!(Gtin::parse("88060952123490").is_err());
    }

    #[test]
    fn names_resolve_case_insensitively() {
        assert_eq!(
            BridgeRequest::from_parts("GSMarenaBridge", None, None).unwrap(),
            BridgeRequest::GsmArena
        );
        assert_eq!(
            BridgeRequest::from_parts("arstechnica", None, None).unwrap(),
            BridgeRequest::ArsTechnica
        );
        assert!(matches!(
            BridgeRequest::from_parts("Reddit", None, None),
            Err(ScoutError::UnknownBridge(_))
        ));
        assert!(matches!(
            BridgeRequest::from_parts("amazon", Some("  "), None),
            Err(ScoutError::MissingParam { param: "q", .. })
        ));
        assert!(matches!(
            BridgeRequest::from_parts("idealo", None, Some("12345")),
            Err(ScoutError::InvalidGtin(_))
        ));
    }

    #[test]
    fn endpoint_urls() {
        let amazon = BridgeRequest::from_parts("amazon", Some("Samsung Galaxy S25 FE"), None).unwrap();
        assert_eq!(
            amazon.endpoint_url("https://bridge.test").unwrap(),
            "https://bridge.test/?action=display&bridge=AmazonBridge&format=Json&q=Samsung+Galaxy+S25+FE"
        );

        let idealo = BridgeRequest::from_parts("IdealoBridge", None, Some("8806095212349")).unwrap();
        assert_eq!(
            idealo.endpoint_url("https://bridge.test/").unwrap(),
            "https://bridge.test/?action=display&bridge=IdealoBridge&format=Json&gtin=8806095212349"
        );

        assert_eq!(
            BridgeRequest::Engadget.endpoint_url("https://bridge.test").unwrap(),
            "https://bridge.test/?action=display&bridge=EngadgetBridge&format=Json"
        );
    }
}
