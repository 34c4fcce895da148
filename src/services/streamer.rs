//! Price streamer
//!
//! Broadcasts a price event for every active bot's symbol once per
//! interval. Prices come from the gateway cache, so streaming stays
//! cheap while the warmer and the bot loops keep entries fresh.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::{PriceTick, Timeframe};
use crate::gateway::MarketDataGateway;
use crate::supervisor::BotSupervisor;

pub struct PriceStreamer {
    supervisor: Arc<BotSupervisor>,
    gateway: Arc<MarketDataGateway>,
    tx: broadcast::Sender<PriceTick>,
    stream_interval: Duration,
}

impl PriceStreamer {
    pub fn new(
        supervisor: Arc<BotSupervisor>,
        gateway: Arc<MarketDataGateway>,
        stream_interval: Duration,
    ) -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            supervisor,
            gateway,
            tx,
            stream_interval,
        }
    }

    /// Subscribe to the stream of per-bot price events.
    pub fn subscribe(&self) -> broadcast::Receiver<PriceTick> {
        self.tx.subscribe()
    }

    /// One streaming pass: push a tick for every active bot with an
    /// available price.
    pub async fn stream_once(&self) {
        for record in self.supervisor.list_active().await {
            if !record.active {
                continue;
            }

            let symbol = record.config.symbol.clone();
            let price = match self.gateway.fetch(&symbol, Timeframe::Daily, true).await {
                Ok(snapshot) => snapshot.info.valid_price(),
                Err(e) => {
                    debug!("Stream fetch failed for {}: {}", symbol, e);
                    None
                }
            };

            if let Some(price) = price {
                // no listeners is fine
                let _ = self.tx.send(PriceTick {
                    bot_id: record.id,
                    symbol,
                    price,
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// Run the streamer as a background task.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.stream_interval);
            loop {
                ticker.tick().await;
                self.stream_once().await;
            }
        })
    }
}
