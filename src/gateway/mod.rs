//! Data gateway: TTL cache plus bounded fetch concurrency in front of
//! the external market data provider.
//!
//! The cache map is the only structure touched by many concurrent
//! callers; every access takes the lock for the duration of the map
//! operation only, never across a provider call. Outbound fetches are
//! bounded process-wide by a semaphore so a burst of cache misses cannot
//! stampede the provider.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::Instant;
use tracing::debug;

use crate::domain::{MarketSnapshot, Timeframe};
use crate::error::{BotError, Result};
use crate::provider::MarketDataProvider;

/// Cache key: upper-cased symbol plus the requested timeframe.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl CacheKey {
    fn new(symbol: &str, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.trim().to_ascii_uppercase(),
            timeframe,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: MarketSnapshot,
    created_at: Instant,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(snapshot: MarketSnapshot, now: Instant, ttl: Duration) -> Self {
        Self {
            snapshot,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    fn is_valid(&self, now: Instant) -> bool {
        now <= self.expires_at
    }
}

/// Live/expired entry counts for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub live: usize,
    pub expired: usize,
}

pub struct MarketDataGateway {
    provider: Arc<dyn MarketDataProvider>,
    cache: RwLock<HashMap<CacheKey, CacheEntry>>,
    permits: Arc<Semaphore>,
    ttl: Duration,
}

impl MarketDataGateway {
    pub fn new(provider: Arc<dyn MarketDataProvider>, max_concurrent_fetches: usize, ttl: Duration) -> Self {
        Self {
            provider,
            cache: RwLock::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(max_concurrent_fetches)),
            ttl,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a snapshot for (symbol, timeframe), serving from cache when
    /// a valid entry exists and `use_cache` is set.
    ///
    /// A cache miss acquires a fetch permit (suspending past the pool
    /// bound), makes one provider call, and overwrites the cache entry.
    /// On provider failure the error surfaces as [`BotError::FetchFailed`]
    /// and any prior valid entry is left untouched.
    pub async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        use_cache: bool,
    ) -> Result<MarketSnapshot> {
        let key = CacheKey::new(symbol, timeframe);

        if use_cache {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.is_valid(Instant::now()) {
                    return Ok(entry.snapshot.clone());
                }
            }
        }

        let snapshot = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| BotError::Internal("fetch permit pool closed".to_string()))?;

            self.provider
                .fetch_bundle(&key.symbol, timeframe)
                .await
                .map_err(|e| match e {
                    BotError::FetchFailed(_) => e,
                    other => BotError::FetchFailed(other.to_string()),
                })?
            // permit released here, fetch succeeded or not
        };

        debug!("Cached {} snapshot for {}", timeframe, key.symbol);
        let entry = CacheEntry::new(snapshot.clone(), Instant::now(), self.ttl);
        self.cache.write().await.insert(key, entry);

        Ok(snapshot)
    }

    /// Evict expired entries. Administrative: expired entries are also
    /// rejected lazily on read.
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut cache = self.cache.write().await;
        let before = cache.len();
        cache.retain(|_, entry| entry.is_valid(now));
        before - cache.len()
    }

    /// Drop every cache entry.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let cache = self.cache.read().await;
        let live = cache.values().filter(|e| e.is_valid(now)).count();
        CacheStats {
            live,
            expired: cache.len() - live,
        }
    }
}
