// cache.rs - TTL memoization for remote lookups
// Each entry carries its own ttl; moka drops it once `fetched_at + ttl` passes.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::Expiry;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            fetched_at: Utc::now(),
            ttl,
        }
    }

    /// Valid iff `now - fetched_at < ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.fetched_at);
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => age < ttl,
            Err(_) => true,
        }
    }
}

struct EntryTtl;

impl<V> Expiry<String, CacheEntry<V>> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-scoped memo keyed by string. No size bound; entries only leave on expiry.
#[derive(Clone)]
pub struct DocumentCache<V: Clone + Send + Sync + 'static> {
    name: &'static str,
    inner: Cache<String, CacheEntry<V>>,
}

impl<V: Clone + Send + Sync + 'static> std::fmt::Debug for DocumentCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("name", &self.name)
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl<V: Clone + Send + Sync + 'static> DocumentCache<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Cache::builder().expire_after(EntryTtl).build(),
        }
    }

    /// Return the cached value for `key`, or run `compute` and store its output.
    /// Concurrent misses on one key share a single `compute`.
    pub async fn get_or_compute<F>(&self, key: &str, ttl: Duration, compute: F) -> V
    where
        F: Future<Output = V>,
    {
        let name = self.name;
        self.inner
            .get_with(key.to_string(), async move {
                debug!("{} cache miss: {}", name, key);
                CacheEntry::new(compute.await, ttl)
            })
            .await
            .value
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but an `Err` from `compute`
    /// is handed back and nothing is stored, so the next call tries again.
    pub async fn try_get_or_compute<F, E>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<V, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        let name = self.name;
        self.inner
            .try_get_with(key.to_string(), async move {
                debug!("{} cache miss: {}", name, key);
                compute.await.map(|value| CacheEntry::new(value, ttl))
            })
            .await
            .map(|entry| entry.value)
    }

    /// Fresh entry for `key`, if any. Never computes.
    pub async fn peek(&self, key: &str) -> Option<CacheEntry<V>> {
        self.inner
            .get(key)
            .await
            .filter(|entry| entry.is_fresh(Utc::now()))
    }

    pub async fn invalidate(&self, key: &str) {
        self.inner.invalidate(key).await;
    }
}
