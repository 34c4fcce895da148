//! Bot supervisor
//!
//! Owns the registry of running bots. Each bot gets its own ledger,
//! its own strategy instance, and one spawned evaluation loop; only
//! that loop ever touches the bot's strategy state, so no cross-bot
//! synchronization is needed beyond the registry lock.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{PortfolioReport, Timeframe};
use crate::error::{BotError, Result};
use crate::gateway::MarketDataGateway;
use crate::ledger::SimulatedLedger;
use crate::strategy::{build_strategy, parse_strategy_kind, Strategy, StrategyParams};

/// Configuration submitted when starting a bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub symbol: String,
    /// Strategy kind name; parsed and rejected before any state is created.
    pub strategy: String,
    pub capital: Decimal,
    pub entry_threshold: Decimal,
    pub exit_threshold: Decimal,
    /// Negative fractional loss that forces an exit.
    pub stop_loss: Decimal,
    /// Evaluation timeframe for the bot's history requests.
    #[serde(default)]
    pub timeframe: Timeframe,
}

impl BotConfig {
    fn params(&self) -> StrategyParams {
        StrategyParams {
            capital: self.capital,
            entry_threshold: self.entry_threshold,
            exit_threshold: self.exit_threshold,
            stop_loss: self.stop_loss,
        }
    }
}

/// Registry view of one bot.
#[derive(Debug, Clone, Serialize)]
pub struct BotRecord {
    pub id: String,
    pub config: BotConfig,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

struct BotHandle {
    record: BotRecord,
    ledger: Arc<Mutex<SimulatedLedger>>,
    /// Signal the loop reads at each iteration boundary.
    active: Arc<AtomicBool>,
    /// Taken by `stop` so the join can happen outside the registry lock.
    task: Option<JoinHandle<()>>,
}

pub struct BotSupervisor {
    gateway: Arc<MarketDataGateway>,
    bots: RwLock<HashMap<String, BotHandle>>,
    tick_interval: Duration,
}

impl BotSupervisor {
    pub fn new(gateway: Arc<MarketDataGateway>, tick_interval: Duration) -> Self {
        Self {
            gateway,
            bots: RwLock::new(HashMap::new()),
            tick_interval,
        }
    }

    /// Start a bot: validate the strategy kind and the symbol, seed a
    /// ledger with the configured capital, register the bot, and spawn
    /// its evaluation loop. Returns the bot id without waiting for the
    /// loop's first iteration.
    pub async fn start(&self, mut config: BotConfig) -> Result<String> {
        let kind = parse_strategy_kind(&config.strategy)?;
        config.symbol = config.symbol.trim().to_ascii_uppercase();

        // One probing fetch; an unresolvable symbol registers nothing.
        self.gateway
            .fetch(&config.symbol, config.timeframe, true)
            .await
            .map_err(|e| {
                warn!("Symbol validation failed for {}: {}", config.symbol, e);
                BotError::InvalidSymbol(config.symbol.clone())
            })?;

        let bot_id = format!(
            "bot_{}_{}",
            config.symbol,
            &Uuid::new_v4().simple().to_string()[..8]
        );

        let ledger = Arc::new(Mutex::new(SimulatedLedger::new(config.capital)));
        let active = Arc::new(AtomicBool::new(true));
        let strategy = build_strategy(kind, config.params());

        let record = BotRecord {
            id: bot_id.clone(),
            config: config.clone(),
            active: true,
            created_at: Utc::now(),
        };

        let task = tokio::spawn(run_bot_loop(
            bot_id.clone(),
            config,
            strategy,
            Arc::clone(&ledger),
            Arc::clone(&self.gateway),
            Arc::clone(&active),
            self.tick_interval,
        ));

        let handle = BotHandle {
            record,
            ledger,
            active,
            task: Some(task),
        };
        self.bots.write().await.insert(bot_id.clone(), handle);

        info!("Started trading bot {}", bot_id);
        Ok(bot_id)
    }

    /// Stop a bot deterministically: flip its active flag, cancel the
    /// evaluation loop, wait for it to terminate, then drop the record
    /// and ledger. After this returns no further trade can execute for
    /// the id and it no longer appears in the active listing.
    pub async fn stop(&self, bot_id: &str) -> Result<()> {
        let task = {
            let mut bots = self.bots.write().await;
            let handle = bots
                .get_mut(bot_id)
                .ok_or_else(|| BotError::BotNotFound(bot_id.to_string()))?;
            handle.active.store(false, Ordering::SeqCst);
            handle.record.active = false;
            handle.task.take()
        };

        if let Some(task) = task {
            task.abort();
            // JoinError::Cancelled is the expected outcome here
            let _ = task.await;
        }

        self.bots.write().await.remove(bot_id);
        info!("Stopped trading bot {}", bot_id);
        Ok(())
    }

    /// Stop every running bot (process shutdown path).
    pub async fn stop_all(&self) {
        let ids: Vec<String> = self.bots.read().await.keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.stop(&id).await {
                warn!("Error stopping bot {}: {}", id, e);
            }
        }
    }

    /// Snapshot of every registered bot, with its current active flag.
    pub async fn list_active(&self) -> Vec<BotRecord> {
        let bots = self.bots.read().await;
        bots.values()
            .map(|handle| {
                let mut record = handle.record.clone();
                record.active = handle.active.load(Ordering::SeqCst);
                record
            })
            .collect()
    }

    pub async fn bot_count(&self) -> usize {
        self.bots.read().await.len()
    }

    /// Portfolio view for one bot, with equity marked against live
    /// prices fetched through the gateway. Symbols without an available
    /// price contribute zero; the read itself never fails on price
    /// availability.
    pub async fn get_portfolio(&self, bot_id: &str) -> Result<PortfolioReport> {
        let ledger = {
            let bots = self.bots.read().await;
            let handle = bots
                .get(bot_id)
                .ok_or_else(|| BotError::BotNotFound(bot_id.to_string()))?;
            Arc::clone(&handle.ledger)
        };

        let snapshot = ledger.lock().await.clone();

        let symbols: Vec<String> = snapshot.positions().keys().cloned().collect();
        let fetches = symbols
            .iter()
            .map(|symbol| self.gateway.fetch(symbol, Timeframe::Daily, true));

        let mut prices = HashMap::new();
        for (symbol, result) in symbols.iter().zip(join_all(fetches).await) {
            match result {
                Ok(snapshot) => {
                    if let Some(price) = snapshot.info.valid_price() {
                        prices.insert(symbol.clone(), price);
                    }
                }
                Err(e) => debug!("No live price for {}: {}", symbol, e),
            }
        }

        Ok(snapshot.report(&prices))
    }
}

/// Per-bot evaluation loop. Runs until cancelled; a failed iteration is
/// logged and contained, never fatal to the loop.
async fn run_bot_loop(
    bot_id: String,
    config: BotConfig,
    mut strategy: Box<dyn Strategy>,
    ledger: Arc<Mutex<SimulatedLedger>>,
    gateway: Arc<MarketDataGateway>,
    active: Arc<AtomicBool>,
    tick_interval: Duration,
) {
    info!(
        "Trading bot {} running: {} on {} every {:?}",
        bot_id, config.strategy, config.symbol, tick_interval
    );

    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !active.load(Ordering::SeqCst) {
            break;
        }

        if let Err(e) =
            evaluate_iteration(&bot_id, &config, strategy.as_mut(), &ledger, &gateway).await
        {
            warn!("Bot {} iteration error: {}", bot_id, e);
        }
    }

    info!("Trading bot {} terminated", bot_id);
}

/// One evaluation pass: fetch, decide, and place at most one order.
///
/// Ledger access and the follow-up strategy-state update sit strictly
/// between suspension points, so cancellation can never leave a trade
/// half-applied.
async fn evaluate_iteration(
    bot_id: &str,
    config: &BotConfig,
    strategy: &mut dyn Strategy,
    ledger: &Mutex<SimulatedLedger>,
    gateway: &MarketDataGateway,
) -> Result<()> {
    let snapshot = gateway.fetch(&config.symbol, config.timeframe, true).await?;

    let Some(price) = snapshot.info.valid_price() else {
        debug!("Bot {}: no valid price for {}, skipping", bot_id, config.symbol);
        return Ok(());
    };
    if snapshot.history.is_empty() {
        debug!("Bot {}: no history for {}, skipping", bot_id, config.symbol);
        return Ok(());
    }

    if !strategy.core().is_long() {
        if strategy.should_buy(price, &snapshot.history) {
            let quantity = strategy.core().calculate_quantity(price);
            let mut ledger = ledger.lock().await;
            match ledger.buy(&config.symbol, price, quantity) {
                Ok(trade) => {
                    strategy.core_mut().open_position(trade.quantity, price);
                    info!(
                        "Bot {}: position opened - {} shares of {} at ${}",
                        bot_id, trade.quantity, config.symbol, price
                    );
                }
                Err(e) => warn!("Bot {}: buy not executed: {}", bot_id, e),
            }
        }
    } else if strategy.should_sell(price, &snapshot.history) {
        let mut ledger = ledger.lock().await;
        let held = ledger.position(&config.symbol).map(|p| p.quantity);
        match held {
            Some(quantity) => match ledger.sell(&config.symbol, price, quantity) {
                Ok(_) => {
                    strategy.core_mut().close_position();
                    info!(
                        "Bot {}: position closed - {} shares of {} at ${}",
                        bot_id, quantity, config.symbol, price
                    );
                }
                Err(e) => warn!("Bot {}: sell not executed: {}", bot_id, e),
            },
            None => {
                // strategy thinks it is long but the ledger holds nothing;
                // resync to flat rather than retrying forever
                warn!(
                    "Bot {}: no ledger position in {} while long, resetting",
                    bot_id, config.symbol
                );
                strategy.core_mut().close_position();
            }
        }
    }

    Ok(())
}
