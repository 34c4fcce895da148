#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use papertrader::domain::{Candle, MarketSnapshot, SymbolInfo, Timeframe};
use papertrader::error::{BotError, Result};
use papertrader::provider::MarketDataProvider;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Deterministic provider for tests: serves a scripted price and
/// history, can be flipped into failure mode, and records call
/// concurrency so tests can observe the permit pool.
pub struct ScriptedProvider {
    price: Mutex<Decimal>,
    closes: Mutex<Vec<Decimal>>,
    delay: Duration,
    fail: AtomicBool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(price: Decimal, closes: Vec<Decimal>) -> Self {
        Self {
            price: Mutex::new(price),
            closes: Mutex::new(closes),
            delay: Duration::ZERO,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Ten rising closes ending at 110 with a current price of 111,
    /// which satisfies the momentum entry conditions.
    pub fn rising() -> Self {
        let closes = (101..=110).map(Decimal::from).collect();
        Self::new(Decimal::from(111), closes)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_price(&self, price: Decimal) {
        *self.price.lock().unwrap() = price;
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn snapshot(&self, symbol: &str) -> MarketSnapshot {
        let price = *self.price.lock().unwrap();
        let history: Vec<Candle> = self
            .closes
            .lock()
            .unwrap()
            .iter()
            .map(|close| Candle {
                timestamp: Utc::now(),
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: Some(1_000),
            })
            .collect();

        MarketSnapshot {
            info: SymbolInfo {
                symbol: symbol.to_string(),
                price: Some(price),
                previous_close: history.first().map(|c| c.close),
                volume: Some(1_000),
                currency: Some("USD".to_string()),
            },
            history,
            news: Vec::new(),
        }
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn fetch_bundle(&self, symbol: &str, _timeframe: Timeframe) -> Result<MarketSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(BotError::FetchFailed(format!("scripted failure: {}", symbol)));
        }

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.snapshot(symbol))
    }
}
