#![allow(dead_code)]

use bridge_scout::antibot::BackoffPolicy;
use bridge_scout::core::config::ScoutConfig;
use bridge_scout::core::error::FailureKind;
use bridge_scout::identity_pool::IdentityPool;
use bridge_scout::transport::ResilientTransport;
use bridge_scout::ScoutContext;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_AGENT: &str = "bridge-scout-test/1.0";

pub fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Zero-delay policy that remembers every delay it was asked for.
#[derive(Default)]
pub struct RecordingBackoff {
    calls: Mutex<Vec<(u32, FailureKind)>>,
}

impl RecordingBackoff {
    pub fn calls(&self) -> Vec<(u32, FailureKind)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, kind: FailureKind) -> usize {
        self.calls().iter().filter(|(_, k)| *k == kind).count()
    }
}

impl BackoffPolicy for RecordingBackoff {
    fn delay(&self, attempt: u32, kind: FailureKind) -> Duration {
        self.calls.lock().unwrap().push((attempt, kind));
        Duration::ZERO
    }
}

pub fn transport_with(policy: Arc<RecordingBackoff>) -> ResilientTransport {
    transport_over(IdentityPool::new(vec![TEST_AGENT.to_string()], false), policy)
}

fn transport_over(pool: IdentityPool, policy: Arc<RecordingBackoff>) -> ResilientTransport {
    ResilientTransport::new(Arc::new(pool))
        .unwrap()
        .with_policy(policy)
        .with_timeouts(Duration::from_secs(2), Duration::from_secs(2))
}

pub fn config_for(server_uri: &str) -> ScoutConfig {
    ScoutConfig {
        bridge_base_url: Some(server_uri.to_string()),
        spec_site_base: Some(server_uri.to_string()),
        spec_site_style: Some("gsmarena".to_string()),
        use_proxy: Some(false),
        static_proxies: Some(Vec::new()),
        proxy_sources: Some(Vec::new()),
        max_attempts: Some(3),
        spec_cache_ttl_secs: Some(3600),
        feed_cache_ttl_secs: Some(600),
        proxy_cache_ttl_secs: Some(300),
        ..Default::default()
    }
}

pub fn context_for(config: ScoutConfig, policy: Arc<RecordingBackoff>) -> ScoutContext {
    ScoutContext::with_transport(config, transport_with(policy))
}

/// Proxy mode on, pool seeded with `proxies`.
pub async fn proxied_context_for(
    config: ScoutConfig,
    policy: Arc<RecordingBackoff>,
    proxies: &[&str],
) -> ScoutContext {
    let pool = IdentityPool::new(vec![TEST_AGENT.to_string()], true);
    pool.replace_proxies(proxies.iter().map(|p| p.to_string()).collect())
        .await;
    ScoutContext::with_transport(config, transport_over(pool, policy))
}
