//! Time-bounded metadata cache
//!
//! A workflow execution may resolve many entries at once; caching the list
//! endpoints avoids a remote round-trip per entry. Entries are keyed by
//! (endpoint, query parameters) so pool-filtered variants of the same
//! endpoint never contaminate each other. Serving an expired entry when the
//! refresh call fails is an explicit, off-by-default policy, and the result
//! carries its freshness so callers can warn the user.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::warn;

use crate::clock::Clock;
use crate::config::CacheConfig;
use crate::Result;

/// Whether a fetched value came from a live call / valid cache entry, or
/// from the stale-fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    Fresh,
    Stale,
}

/// A cached or freshly fetched value plus its freshness.
#[derive(Debug, Clone)]
pub struct Fetched<T = Value> {
    pub value: T,
    pub freshness: Freshness,
}

impl<T> Fetched<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched {
            value: f(self.value),
            freshness: self.freshness,
        }
    }

    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self.freshness, Freshness::Stale)
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl CacheKey {
    fn new(endpoint: &str, params: &[(&str, &str)]) -> Self {
        let mut params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        params.sort();
        Self {
            endpoint: endpoint.to_string(),
            params,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// Cache statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stale_serves: u64,
}

/// Shared metadata cache for the remote gateway.
///
/// Explicitly constructed and passed to consumers; one instance is shared
/// across all node instances for the process lifetime.
pub struct MetadataCache {
    default_ttl: Duration,
    serve_stale_on_error: bool,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    stats: RwLock<CacheStats>,
}

impl MetadataCache {
    #[must_use]
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            default_ttl: Duration::from_secs(config.ttl_secs),
            serve_stale_on_error: config.serve_stale_on_error,
            clock,
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// TTL used by [`fetch_cached`](Self::fetch_cached).
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Look up `(endpoint, params)`; on miss or expiry run `fetch` and store
    /// the result for `ttl`.
    ///
    /// When the remote call fails and an expired entry is still present, the
    /// stale value is served only under the `serve_stale_on_error` policy,
    /// logged, counted, and marked [`Freshness::Stale`] in the result.
    pub async fn fetch_cached_with_ttl<F, Fut>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        ttl: Duration,
        fetch: F,
    ) -> Result<Fetched>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let key = CacheKey::new(endpoint, params);
        let now = self.clock.now();

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&key) {
                if now < entry.expires_at {
                    self.stats.write().await.hits += 1;
                    debug!("Cache hit for {endpoint}");
                    return Ok(Fetched {
                        value: entry.value.clone(),
                        freshness: Freshness::Fresh,
                    });
                }
            }
        }

        match fetch().await {
            Ok(value) => {
                let mut entries = self.entries.write().await;
                entries.insert(
                    key,
                    CacheEntry {
                        value: value.clone(),
                        expires_at: now + ttl,
                    },
                );
                self.stats.write().await.misses += 1;
                Ok(Fetched {
                    value,
                    freshness: Freshness::Fresh,
                })
            }
            Err(err) => {
                if self.serve_stale_on_error {
                    let entries = self.entries.read().await;
                    if let Some(entry) = entries.get(&key) {
                        warn!("Remote call for {endpoint} failed ({err}); serving stale cache entry");
                        self.stats.write().await.stale_serves += 1;
                        return Ok(Fetched {
                            value: entry.value.clone(),
                            freshness: Freshness::Stale,
                        });
                    }
                }
                Err(err)
            }
        }
    }

    /// [`fetch_cached_with_ttl`](Self::fetch_cached_with_ttl) using the
    /// configured default TTL.
    pub async fn fetch_cached<F, Fut>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        fetch: F,
    ) -> Result<Fetched>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        self.fetch_cached_with_ttl(endpoint, params, self.default_ttl, fetch)
            .await
    }

    /// Drop a single entry.
    pub async fn invalidate(&self, endpoint: &str, params: &[(&str, &str)]) {
        let key = CacheKey::new(endpoint, params);
        self.entries.write().await.remove(&key);
    }

    /// Drop everything.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use super::*;
    use crate::clock::ManualClock;
    use crate::LoraBridgeError;

    fn cache(serve_stale: bool) -> (MetadataCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = CacheConfig {
            ttl_secs: 60,
            serve_stale_on_error: serve_stale,
        };
        (MetadataCache::new(&config, clock.clone()), clock)
    }

    #[tokio::test]
    async fn fresh_hit_skips_remote_call() {
        let (cache, _clock) = cache(false);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let fetched = cache
                .fetch_cached("/api/lm/loras/list", &[], || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"items": []}))
                })
                .await
                .unwrap();
            assert_eq!(fetched.freshness, Freshness::Fresh);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_new_call() {
        let (cache, clock) = cache(false);
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!(1))
        };
        cache.fetch_cached("/x", &[], fetch).await.unwrap();

        clock.advance(Duration::from_secs(61));
        cache.fetch_cached("/x", &[], fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn params_are_part_of_the_key() {
        let (cache, _clock) = cache(false);

        cache
            .fetch_cached("/list", &[("pool", "a")], || async { Ok(json!("a")) })
            .await
            .unwrap();
        let other = cache
            .fetch_cached("/list", &[("pool", "b")], || async { Ok(json!("b")) })
            .await
            .unwrap();

        assert_eq!(other.value, json!("b"));
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn param_order_does_not_matter() {
        let (cache, _clock) = cache(false);
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!(null))
        };
        cache
            .fetch_cached("/list", &[("a", "1"), ("b", "2")], fetch)
            .await
            .unwrap();
        cache
            .fetch_cached("/list", &[("b", "2"), ("a", "1")], fetch)
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_fallback_is_off_by_default() {
        let (cache, clock) = cache(false);

        cache
            .fetch_cached("/x", &[], || async { Ok(json!("old")) })
            .await
            .unwrap();
        clock.advance(Duration::from_secs(61));

        let result = cache
            .fetch_cached("/x", &[], || async {
                Err(LoraBridgeError::RemoteUnreachable("down".into()))
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stale_fallback_serves_marked_value_when_enabled() {
        let (cache, clock) = cache(true);

        cache
            .fetch_cached("/x", &[], || async { Ok(json!("old")) })
            .await
            .unwrap();
        clock.advance(Duration::from_secs(61));

        let fetched = cache
            .fetch_cached("/x", &[], || async {
                Err(LoraBridgeError::RemoteUnreachable("down".into()))
            })
            .await
            .unwrap();
        assert!(fetched.is_stale());
        assert_eq!(fetched.value, json!("old"));
        assert_eq!(cache.stats().await.stale_serves, 1);
    }

    #[tokio::test]
    async fn failed_call_without_prior_entry_is_an_error_even_with_fallback() {
        let (cache, _clock) = cache(true);
        let result = cache
            .fetch_cached("/x", &[], || async {
                Err(LoraBridgeError::RemoteUnreachable("down".into()))
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let (cache, _clock) = cache(false);
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!(null))
        };
        cache.fetch_cached("/x", &[], fetch).await.unwrap();
        cache.invalidate("/x", &[]).await;
        cache.fetch_cached("/x", &[], fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
