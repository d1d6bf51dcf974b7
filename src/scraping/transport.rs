//! Resilient GET transport.
//!
//! Every attempt draws a fresh [`Identity`] from the pool. HTTP 429 waits out
//! the rate-limit cooldown; network errors and any other non-200 status wait a
//! randomized backoff. Both count against the same attempt budget, and running
//! out yields [`TransportError::Exhausted`] instead of a panic.

use crate::core::config::ScoutConfig;
use crate::core::error::{FailureKind, TransportError};
use crate::features::antibot::{self, BackoffPolicy, JitteredBackoff};
use crate::features::identity_pool::{mask_proxy_credentials, IdentityPool};
use crate::types::{Identity, RawResponse};
use backoff::backoff::Backoff;
use backoff::future::retry_notify;
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Which timeout applies to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchProfile {
    /// HTML spec sites.
    Scrape,
    /// RSS-bridge and proxy-list endpoints.
    Feed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Rotating,
    Direct,
}

/// Attempts made so far and how the latest one failed.
#[derive(Debug, Default)]
struct AttemptLedger {
    attempts: u32,
    last_failure: Option<FailureKind>,
}

impl AttemptLedger {
    fn begin(&mut self) -> u32 {
        self.attempts += 1;
        self.last_failure = None;
        self.attempts
    }
}

/// Adapts a [`BackoffPolicy`] to `backoff`: the delay follows the kind of the
/// failure just recorded, and `None` once the attempt budget is spent.
struct AttemptBudget<'a> {
    policy: &'a dyn BackoffPolicy,
    max_attempts: u32,
    ledger: &'a Mutex<AttemptLedger>,
}

impl Backoff for AttemptBudget<'_> {
    fn reset(&mut self) {
        if let Ok(mut ledger) = self.ledger.lock() {
            *ledger = AttemptLedger::default();
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        let ledger = self.ledger.lock().ok()?;
        if ledger.attempts >= self.max_attempts {
            return None;
        }
        let kind = ledger.last_failure.unwrap_or(FailureKind::Transient);
        let delay = self.policy.delay(ledger.attempts, kind);
        if kind == FailureKind::RateLimited {
            info!("Rate limited; cooling down {:?}", delay);
        }
        Some(delay)
    }
}

pub struct ResilientTransport {
    client: Client,
    identities: Arc<IdentityPool>,
    policy: Arc<dyn BackoffPolicy>,
    max_attempts: u32,
    scrape_timeout: Duration,
    feed_timeout: Duration,
}

impl std::fmt::Debug for ResilientTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientTransport")
            .field("max_attempts", &self.max_attempts)
            .field("scrape_timeout", &self.scrape_timeout)
            .field("feed_timeout", &self.feed_timeout)
            .field("use_proxy", &self.identities.use_proxy())
            .finish()
    }
}

fn build_client(proxy_url: Option<&str>) -> reqwest::Result<Client> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::limited(10));
    if let Some(proxy_url) = proxy_url {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }
    builder.build()
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timeout: {}", e)
    } else if e.is_connect() {
        format!("connect: {}", e)
    } else {
        e.to_string()
    }
}

impl ResilientTransport {
    /// 3 attempts, 12s/15s timeouts, 30s cooldown, 2-4s backoff.
    pub fn new(identities: Arc<IdentityPool>) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(None)?,
            identities,
            policy: Arc::new(JitteredBackoff::default()),
            max_attempts: 3,
            scrape_timeout: Duration::from_secs(12),
            feed_timeout: Duration::from_secs(15),
        })
    }

    pub fn from_config(config: &ScoutConfig, identities: Arc<IdentityPool>) -> reqwest::Result<Self> {
        Ok(Self::new(identities)?
            .with_policy(Arc::new(JitteredBackoff::from_config(config)))
            .with_max_attempts(config.resolve_max_attempts())
            .with_timeouts(config.resolve_scrape_timeout(), config.resolve_feed_timeout()))
    }

    pub fn with_policy(mut self, policy: Arc<dyn BackoffPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_timeouts(mut self, scrape: Duration, feed: Duration) -> Self {
        self.scrape_timeout = scrape;
        self.feed_timeout = feed;
        self
    }

    pub fn identities(&self) -> &Arc<IdentityPool> {
        &self.identities
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn timeout_for(&self, profile: FetchProfile) -> Duration {
        match profile {
            FetchProfile::Scrape => self.scrape_timeout,
            FetchProfile::Feed => self.feed_timeout,
        }
    }

    /// GET `url`, retrying within the attempt budget. Only a 200 counts as success.
    pub async fn fetch(&self, url: &str, profile: FetchProfile) -> Result<RawResponse, TransportError> {
        self.fetch_routed(url, profile, Route::Rotating).await
    }

    /// Like [`fetch`](Self::fetch), but every attempt goes out without a proxy.
    /// Proxy-list sources are fetched this way so a dead pool cannot block its
    /// own refresh.
    pub async fn fetch_direct(
        &self,
        url: &str,
        profile: FetchProfile,
    ) -> Result<RawResponse, TransportError> {
        self.fetch_routed(url, profile, Route::Direct).await
    }

    async fn fetch_routed(
        &self,
        url: &str,
        profile: FetchProfile,
        route: Route,
    ) -> Result<RawResponse, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(TransportError::InvalidUrl {
                url: url.to_string(),
                reason: "URL must use HTTP or HTTPS protocol".to_string(),
            });
        }

        let timeout = self.timeout_for(profile);
        let ledger = Mutex::new(AttemptLedger::default());
        let budget = AttemptBudget {
            policy: self.policy.as_ref(),
            max_attempts: self.max_attempts,
            ledger: &ledger,
        };

        let result = retry_notify(
            budget,
            || async {
                let attempt = ledger.lock().map(|mut l| l.begin()).unwrap_or(1);
                let mut identity = self.identities.next_identity().await;
                if route == Route::Direct {
                    identity.proxy_endpoint = None;
                }
                let via = identity
                    .proxy_endpoint
                    .as_deref()
                    .map(mask_proxy_credentials)
                    .unwrap_or_else(|| "direct".to_string());
                info!(
                    "GET {} (attempt {}/{}, via {})",
                    parsed, attempt, self.max_attempts, via
                );

                self.attempt(&parsed, identity, timeout).await.map_err(|(kind, reason)| {
                    warn!(
                        "Attempt {}/{} for {} failed via {}: {}",
                        attempt, self.max_attempts, parsed, via, reason
                    );
                    if let Ok(mut l) = ledger.lock() {
                        l.last_failure = Some(kind);
                    }
                    backoff::Error::transient(reason)
                })
            },
            |_reason: String, delay: Duration| {
                info!("Retrying {} in {:?}", parsed, delay);
            },
        )
        .await;

        result.map_err(|last_error| TransportError::Exhausted {
            attempts: ledger.lock().map(|l| l.attempts).unwrap_or(self.max_attempts),
            last_error,
        })
    }

    async fn attempt(
        &self,
        url: &Url,
        identity: Identity,
        timeout: Duration,
    ) -> Result<RawResponse, (FailureKind, String)> {
        let proxied;
        let client = match identity.proxy_endpoint.as_deref() {
            Some(proxy_url) => {
                proxied = build_client(Some(proxy_url)).map_err(|e| {
                    (
                        FailureKind::Transient,
                        format!("invalid proxy {}: {}", mask_proxy_credentials(proxy_url), e),
                    )
                })?;
                &proxied
            }
            None => &self.client,
        };

        let mut request = client
            .get(url.clone())
            .header(USER_AGENT, identity.user_agent.as_str())
            .timeout(timeout);
        for (name, value) in antibot::get_stealth_headers() {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| (FailureKind::Transient, describe(&e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err((FailureKind::RateLimited, "HTTP 429 Too Many Requests".to_string()));
        }
        if status != StatusCode::OK {
            return Err((FailureKind::Transient, format!("HTTP {}", status)));
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| (FailureKind::Transient, format!("body read failed: {}", describe(&e))))?;

        Ok(RawResponse {
            url: final_url,
            status: status.as_u16(),
            body,
            identity,
        })
    }
}
