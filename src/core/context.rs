use crate::core::cache::DocumentCache;
use crate::core::config::ScoutConfig;
use crate::core::error::ScoutError;
use crate::features::identity_pool::IdentityPool;
use crate::features::proxy_grabber;
use crate::scraping::transport::ResilientTransport;
use crate::tools::specs::SpecSite;
use crate::types::{FeedEntry, SearchHit, SpecSheet};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a fetch needs, owned in one place and passed explicitly.
#[derive(Clone)]
pub struct ScoutContext {
    pub config: Arc<ScoutConfig>,
    pub transport: Arc<ResilientTransport>,
    pub spec_site: SpecSite,
    pub bridge_base: String,
    // Caches for remote lookups
    pub search_cache: DocumentCache<Vec<SearchHit>>, // key: search url
    pub spec_cache: DocumentCache<SpecSheet>,        // key: page url
    pub feed_cache: DocumentCache<Vec<FeedEntry>>,   // key: bridge url
    pub proxy_cache: DocumentCache<BTreeSet<String>>, // key: joined source list
}

impl std::fmt::Debug for ScoutContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoutContext")
            .field("spec_site", &self.spec_site)
            .field("bridge_base", &self.bridge_base)
            .field("transport", &self.transport)
            .finish()
    }
}

impl ScoutContext {
    pub fn new(config: ScoutConfig) -> anyhow::Result<Self> {
        let identities = Arc::new(IdentityPool::from_config(&config));
        let transport = ResilientTransport::from_config(&config, identities)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Build around a preconfigured transport (custom backoff policy, attempt budget).
    pub fn with_transport(config: ScoutConfig, transport: ResilientTransport) -> Self {
        let spec_site = SpecSite::from_config(&config);
        let bridge_base = config.resolve_bridge_base();
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            spec_site,
            bridge_base,
            search_cache: DocumentCache::new("search"),
            spec_cache: DocumentCache::new("spec"),
            feed_cache: DocumentCache::new("feed"),
            proxy_cache: DocumentCache::new("proxy"),
        }
    }

    pub fn identities(&self) -> &Arc<IdentityPool> {
        self.transport.identities()
    }

    /// Refresh the proxy pool from the configured sources.
    ///
    /// The merged list is cached for the proxy TTL, so repeated calls inside
    /// that window reuse it without touching the sources. A refresh that yields
    /// no proxies leaves the current pool in place and is not cached. Returns
    /// the pool size.
    pub async fn refresh_proxies(&self) -> usize {
        let sources = self.config.resolve_proxy_sources();
        if sources.is_empty() {
            debug!("No proxy sources configured; keeping current pool");
            return self.identities().proxy_count().await;
        }

        let key = sources.join("\n");
        let ttl = self.config.resolve_proxy_cache_ttl();
        let transport = self.transport.clone();
        let result = self
            .proxy_cache
            .try_get_or_compute(&key, ttl, async move {
                let report = proxy_grabber::refresh_proxy_pool(&transport, &sources).await;
                if report.proxies.is_empty() {
                    return Err(ScoutError::NoProxies {
                        sources: sources.len(),
                        failed: report.failed_sources.len(),
                    });
                }
                Ok(report.proxies)
            })
            .await;

        match result {
            Ok(proxies) => {
                debug!("Proxy pool: {:?}", proxy_grabber::masked_list(&proxies));
                let count = proxies.len();
                self.identities().replace_proxies(proxies).await;
                info!("Proxy pool holds {} endpoints", count);
                count
            }
            Err(e) => {
                let count = self.identities().proxy_count().await;
                warn!("{}; keeping current pool of {}", e, count);
                count
            }
        }
    }

    /// Refresh from the sources now, ignoring a cached merge.
    pub async fn force_refresh_proxies(&self) -> usize {
        let key = self.config.resolve_proxy_sources().join("\n");
        self.proxy_cache.invalidate(&key).await;
        self.refresh_proxies().await
    }
}
