//! Cache warmer
//!
//! Keeps the gateway cache fresh for a fixed symbol set across all
//! supported timeframes so foreground requests rarely pay live fetch
//! latency. Warms once at startup, then re-warms just before each TTL
//! window expires.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::Timeframe;
use crate::gateway::MarketDataGateway;

pub struct CacheWarmer {
    gateway: Arc<MarketDataGateway>,
    symbols: Vec<String>,
    refresh_interval: Duration,
}

impl CacheWarmer {
    /// `warm_lead` is how long before TTL expiry the next warm pass
    /// starts; it must be smaller than the gateway's TTL.
    pub fn new(gateway: Arc<MarketDataGateway>, symbols: Vec<String>, warm_lead: Duration) -> Self {
        let refresh_interval = gateway
            .cache_ttl()
            .saturating_sub(warm_lead)
            .max(Duration::from_secs(1));

        Self {
            gateway,
            symbols,
            refresh_interval,
        }
    }

    /// One warm pass over every (symbol, timeframe) pair. Bypasses the
    /// cache so entries are refreshed before they expire; failures are
    /// logged and skipped.
    pub async fn warm_once(&self) {
        let fetches = self.symbols.iter().flat_map(|symbol| {
            Timeframe::ALL
                .iter()
                .map(move |timeframe| self.gateway.fetch(symbol, *timeframe, false))
        });

        let mut warmed = 0usize;
        for result in join_all(fetches).await {
            match result {
                Ok(_) => warmed += 1,
                Err(e) => warn!("Cache warm fetch failed: {}", e),
            }
        }
        debug!(
            "Cache warm pass complete: {}/{} entries refreshed",
            warmed,
            self.symbols.len() * Timeframe::ALL.len()
        );
    }

    /// Run the warmer as a background task: an immediate pass, then one
    /// per refresh interval.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        info!(
            "Cache warmer covering {} symbols, refreshing every {:?}",
            self.symbols.len(),
            self.refresh_interval
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.refresh_interval);
            loop {
                ticker.tick().await;
                self.warm_once().await;
            }
        })
    }
}
