use std::future::Future;
use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::CacheSettings;
use crate::models::{LiquidityReading, TvlHistory, VolatilityReading};
use crate::utils::metrics::GaugeMetrics;

/// Upstream a cached value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    Liquidity,
    LiquidityHistory,
    MarketData,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Liquidity => "liquidity",
            DataSource::LiquidityHistory => "liquidity_history",
            DataSource::MarketData => "market_data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source: DataSource,
    pub key: String,
}

impl CacheKey {
    pub fn new(source: DataSource, key: &str) -> Self {
        Self {
            source,
            key: key.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// Expires each entry after its own TTL.
struct EntryTtl;

impl<T> Expiry<CacheKey, CacheEntry<T>> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheEntry<T>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// TTL memoization for one kind of reading.
///
/// Concurrent misses on the same key share one fetch; different keys never
/// wait on each other. Expired entries are dropped on the next access.
pub struct ReadingCache<T> {
    store: Cache<CacheKey, CacheEntry<T>>,
    name: &'static str,
    default_ttl: Duration,
    metrics: Option<GaugeMetrics>,
}

impl<T> ReadingCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str, default_ttl: Duration, max_capacity: u64) -> Self {
        let store = Cache::builder()
            .name(name)
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();

        Self {
            store,
            name,
            default_ttl,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: GaugeMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Return the cached value for `key`, or run `fetch` and keep its result
    /// for `ttl`.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, ttl: Duration, fetch: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(entry) = self.store.get(&key).await {
            if !entry.is_expired() {
                debug!(cache = self.name, source = key.source.as_str(), key = %key.key, "Cache hit");
                self.record(true);
                return entry.value;
            }
            // The store should never hand back an expired entry.
            warn!(cache = self.name, key = %key.key, "Expired entry served by store, refetching");
            self.store.invalidate(&key).await;
        }

        let entry = self
            .store
            .entry(key.clone())
            .or_insert_with(async move {
                CacheEntry {
                    value: fetch().await,
                    inserted_at: Instant::now(),
                    ttl,
                }
            })
            .await;

        let fresh = entry.is_fresh();
        debug!(cache = self.name, source = key.source.as_str(), key = %key.key, fetched = fresh, "Cache miss");
        self.record(!fresh);
        entry.into_value().value
    }

    /// `get_or_fetch` with the cache's default TTL.
    pub async fn get_or_fetch_default<F, Fut>(&self, key: CacheKey, fetch: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.get_or_fetch(key, self.default_ttl, fetch).await
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.run_pending_tasks().await;
        CacheStats {
            cache_name: self.name.to_string(),
            entries: self.store.entry_count(),
            default_ttl_seconds: self.default_ttl.as_secs(),
        }
    }

    fn record(&self, hit: bool) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_lookup(self.name, hit);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub cache_name: String,
    pub entries: u64,
    pub default_ttl_seconds: u64,
}

/// The process-wide caches, one per reading type.
pub struct CacheManager {
    pub liquidity: ReadingCache<LiquidityReading>,
    pub history: ReadingCache<TvlHistory>,
    pub market: ReadingCache<VolatilityReading>,
}

impl CacheManager {
    pub fn new(settings: &CacheSettings) -> Self {
        let ttl = settings.ttl();
        info!(ttl_seconds = ttl.as_secs(), max_capacity = settings.max_capacity, "Initializing reading caches");

        Self {
            liquidity: ReadingCache::new("liquidity", ttl, settings.max_capacity),
            history: ReadingCache::new("liquidity_history", ttl, settings.max_capacity),
            market: ReadingCache::new("market_data", ttl, settings.max_capacity),
        }
    }

    pub fn with_metrics(self, metrics: &GaugeMetrics) -> Self {
        Self {
            liquidity: self.liquidity.with_metrics(metrics.clone()),
            history: self.history.with_metrics(metrics.clone()),
            market: self.market.with_metrics(metrics.clone()),
        }
    }

    pub async fn get_all_stats(&self) -> Vec<CacheStats> {
        vec![
            self.liquidity.stats().await,
            self.history.stats().await,
            self.market.stats().await,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn key(k: &str) -> CacheKey {
        CacheKey::new(DataSource::Liquidity, k)
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let cache = ReadingCache::<u32>::new("test", Duration::from_secs(60), 100);
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..3 {
            let value = cache
                .get_or_fetch_default(key("aave"), || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    7
                })
                .await;
            assert_eq!(value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_refetch() {
        let cache = ReadingCache::<u32>::new("test", Duration::from_millis(50), 100);
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let fetch = || async move { counter.fetch_add(1, Ordering::SeqCst) as u32 };

        assert_eq!(cache.get_or_fetch_default(key("aave"), fetch).await, 0);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.get_or_fetch_default(key("aave"), fetch).await, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = ReadingCache::<String>::new("test", Duration::from_secs(60), 100);
        let a = cache.get_or_fetch_default(key("aave"), || async { "a".to_string() }).await;
        let b = cache
            .get_or_fetch_default(CacheKey::new(DataSource::MarketData, "aave"), || async { "b".to_string() })
            .await;
        assert_eq!(a, "a");
        assert_eq!(b, "b");
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let cache = Arc::new(ReadingCache::<u32>::new("test", Duration::from_secs(60), 100));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_fetch_default(key("curve"), || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            42
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
