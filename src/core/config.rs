use std::path::PathBuf;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ScoutConfig: file-based config loader (bridge-scout.json) with env-var fallback
// ---------------------------------------------------------------------------

pub const DEFAULT_BRIDGE_BASE: &str = "https://rss-57uz.onrender.com";
pub const DEFAULT_SPEC_SITE_BASE: &str = "https://www.gsmarena.com";

/// Every field is optional; `resolve_*` walks JSON field → env var → default.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ScoutConfig {
    /// RSS-bridge base URL, e.g. `https://rss.example.org`.
    pub bridge_base_url: Option<String>,
    /// Spec site base URL.
    pub spec_site_base: Option<String>,
    /// Suggestion layout of the spec site: `gsmarena` (default) or `phonearena`.
    pub spec_site_style: Option<String>,

    /// Route requests through proxies. Off unless explicitly enabled.
    pub use_proxy: Option<bool>,
    /// Fixed proxies used until (or instead of) a remote refresh.
    pub static_proxies: Option<Vec<String>>,
    /// Remote proxy-list URLs (newline-delimited `host:port` text).
    pub proxy_sources: Option<Vec<String>>,
    /// Replaces the built-in user-agent rotation set when non-empty.
    pub user_agents: Option<Vec<String>>,

    pub scrape_timeout_secs: Option<u64>,
    pub feed_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub rate_limit_cooldown_secs: Option<u64>,
    pub backoff_min_ms: Option<u64>,
    pub backoff_max_ms: Option<u64>,

    pub spec_cache_ttl_secs: Option<u64>,
    pub feed_cache_ttl_secs: Option<u64>,
    pub proxy_cache_ttl_secs: Option<u64>,

    /// Where `spec-dump` writes SpecSheet JSON files.
    pub output_dir: Option<String>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    let v = env_string(key)?.to_ascii_lowercase();
    match v.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_list(key: &str) -> Option<Vec<String>> {
    let list: Vec<String> = env_string(key)?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ScoutConfig {
    /// `bridge_base_url` → `BRIDGE_BASE_URL` → public default bridge.
    pub fn resolve_bridge_base(&self) -> String {
        non_blank(&self.bridge_base_url)
            .or_else(|| env_string("BRIDGE_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_BRIDGE_BASE.to_string())
    }

    /// `spec_site_base` → `SPEC_SITE_BASE` → `https://www.gsmarena.com`.
    pub fn resolve_spec_site_base(&self) -> String {
        non_blank(&self.spec_site_base)
            .or_else(|| env_string("SPEC_SITE_BASE"))
            .unwrap_or_else(|| DEFAULT_SPEC_SITE_BASE.to_string())
    }

    pub fn resolve_spec_site_style(&self) -> String {
        non_blank(&self.spec_site_style)
            .or_else(|| env_string("SPEC_SITE_STYLE"))
            .unwrap_or_else(|| "gsmarena".to_string())
            .to_ascii_lowercase()
    }

    /// `use_proxy` → `SCOUT_USE_PROXY` → `false`.
    pub fn resolve_use_proxy(&self) -> bool {
        self.use_proxy
            .or_else(|| env_bool("SCOUT_USE_PROXY"))
            .unwrap_or(false)
    }

    /// `static_proxies` → `PROXY_LIST` (comma-separated) → empty.
    pub fn resolve_static_proxies(&self) -> Vec<String> {
        self.static_proxies
            .clone()
            .or_else(|| env_list("PROXY_LIST"))
            .unwrap_or_default()
    }

    /// `proxy_sources` → `PROXY_SOURCES` (comma-separated) → empty.
    pub fn resolve_proxy_sources(&self) -> Vec<String> {
        self.proxy_sources
            .clone()
            .or_else(|| env_list("PROXY_SOURCES"))
            .unwrap_or_default()
    }

    pub fn resolve_user_agents(&self) -> Vec<String> {
        match &self.user_agents {
            Some(list) if !list.is_empty() => list.clone(),
            _ => crate::features::antibot::USER_AGENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Scrape targets: `SCRAPE_TIMEOUT_SECS` → 12s.
    pub fn resolve_scrape_timeout(&self) -> Duration {
        Duration::from_secs(
            self.scrape_timeout_secs
                .or_else(|| env_parse("SCRAPE_TIMEOUT_SECS"))
                .unwrap_or(12),
        )
    }

    /// Feed and proxy-list endpoints: `FEED_TIMEOUT_SECS` → 15s.
    pub fn resolve_feed_timeout(&self) -> Duration {
        Duration::from_secs(
            self.feed_timeout_secs
                .or_else(|| env_parse("FEED_TIMEOUT_SECS"))
                .unwrap_or(15),
        )
    }

    /// Total tries per fetch: `FETCH_MAX_ATTEMPTS` → 3 (never below 1).
    pub fn resolve_max_attempts(&self) -> u32 {
        self.max_attempts
            .or_else(|| env_parse("FETCH_MAX_ATTEMPTS"))
            .unwrap_or(3)
            .max(1)
    }

    pub fn resolve_rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(
            self.rate_limit_cooldown_secs
                .or_else(|| env_parse("RATE_LIMIT_COOLDOWN_SECS"))
                .unwrap_or(30),
        )
    }

    /// Randomized backoff bounds in ms, swapped if given in the wrong order.
    pub fn resolve_backoff_range(&self) -> (u64, u64) {
        let min = self
            .backoff_min_ms
            .or_else(|| env_parse("BACKOFF_MIN_MS"))
            .unwrap_or(2000);
        let max = self
            .backoff_max_ms
            .or_else(|| env_parse("BACKOFF_MAX_MS"))
            .unwrap_or(4000);
        if min > max {
            (max, min)
        } else {
            (min, max)
        }
    }

    /// Search suggestions and spec pages: `SPEC_CACHE_TTL_SECS` → 1h.
    pub fn resolve_spec_cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.spec_cache_ttl_secs
                .or_else(|| env_parse("SPEC_CACHE_TTL_SECS"))
                .unwrap_or(60 * 60),
        )
    }

    pub fn resolve_feed_cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.feed_cache_ttl_secs
                .or_else(|| env_parse("FEED_CACHE_TTL_SECS"))
                .unwrap_or(60 * 10),
        )
    }

    /// Proxy-list refresh window: `PROXY_CACHE_TTL_SECS` → 300s.
    pub fn resolve_proxy_cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.proxy_cache_ttl_secs
                .or_else(|| env_parse("PROXY_CACHE_TTL_SECS"))
                .unwrap_or(300),
        )
    }

    pub fn resolve_output_dir(&self) -> PathBuf {
        PathBuf::from(
            non_blank(&self.output_dir)
                .or_else(|| env_string("SPEC_OUTPUT_DIR"))
                .unwrap_or_else(|| "specs".to_string()),
        )
    }
}

/// Load `bridge-scout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `BRIDGE_SCOUT_CONFIG` env var path
/// 2. `./bridge-scout.json`
/// 3. `../bridge-scout.json`
///
/// Missing file → `ScoutConfig::default()` (silent, all env-var fallbacks apply).
/// Parse error → log a warning, return `ScoutConfig::default()`.
pub fn load_scout_config() -> ScoutConfig {
    let candidates: Vec<PathBuf> = {
        let mut v = vec![
            PathBuf::from("bridge-scout.json"),
            PathBuf::from("../bridge-scout.json"),
        ];
        if let Ok(env_path) = std::env::var("BRIDGE_SCOUT_CONFIG") {
            v.insert(0, PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        return match serde_json::from_str::<ScoutConfig>(&contents) {
            Ok(cfg) => {
                tracing::info!("bridge-scout.json loaded from {}", path.display());
                cfg
            }
            Err(e) => {
                tracing::warn!(
                    "bridge-scout.json parse error at {}: {}; using defaults",
                    path.display(),
                    e
                );
                ScoutConfig::default()
            }
        };
    }

    ScoutConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fields_win_over_defaults() {
        let cfg: ScoutConfig = serde_json::from_str(
            r#"{
                "bridge_base_url": "https://bridge.test",
                "use_proxy": true,
                "max_attempts": 0,
                "backoff_min_ms": 900,
                "backoff_max_ms": 100,
                "user_agents": ["test-agent/1.0"]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.resolve_bridge_base(), "https://bridge.test");
        assert!(cfg.resolve_use_proxy());
        assert_eq!(cfg.resolve_max_attempts(), 1);
        assert_eq!(cfg.resolve_backoff_range(), (100, 900));
        assert_eq!(cfg.resolve_user_agents(), vec!["test-agent/1.0".to_string()]);
    }

    #[test]
    fn blank_strings_fall_through() {
        let cfg = ScoutConfig {
            spec_site_base: Some("   ".into()),
            user_agents: Some(vec![]),
            ..Default::default()
        };
        assert!(!cfg.resolve_spec_site_base().trim().is_empty());
        assert!(!cfg.resolve_user_agents().is_empty());
    }
}
