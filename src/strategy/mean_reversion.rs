//! Mean reversion strategy: buy at the lower Bollinger band, exit when
//! price reverts to the rolling mean.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::Candle;
use crate::strategy::traits::{Strategy, StrategyCore, StrategyParams};
use crate::strategy::StrategyKind;

const LOOKBACK: usize = 20;
const STD_DEV_THRESHOLD: f64 = 2.0;

pub struct MeanReversionStrategy {
    core: StrategyCore,
}

impl MeanReversionStrategy {
    pub fn new(params: StrategyParams) -> Self {
        Self {
            core: StrategyCore::new(params),
        }
    }

    /// Rolling mean and standard deviation over the lookback window.
    /// Runs in f64; the band comparison does not need exact decimals.
    fn bands(history: &[Candle]) -> Option<(f64, f64)> {
        if history.len() < LOOKBACK {
            return None;
        }

        let closes: Vec<f64> = history[history.len() - LOOKBACK..]
            .iter()
            .filter_map(|c| c.close.to_f64())
            .collect();
        if closes.len() < LOOKBACK {
            return None;
        }

        let mean = closes.iter().sum::<f64>() / closes.len() as f64;
        let variance = closes.iter().map(|c| (c - mean).powi(2)).sum::<f64>()
            / (closes.len() - 1) as f64;
        Some((mean, variance.sqrt()))
    }
}

impl Strategy for MeanReversionStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MeanReversion
    }

    fn core(&self) -> &StrategyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StrategyCore {
        &mut self.core
    }

    fn should_buy(&mut self, price: Decimal, history: &[Candle]) -> bool {
        if self.core.is_long() {
            return false;
        }

        let Some((mean, std)) = Self::bands(history) else {
            return false;
        };
        let Some(price) = price.to_f64() else {
            return false;
        };

        price <= mean - STD_DEV_THRESHOLD * std
    }

    fn should_sell(&mut self, price: Decimal, history: &[Candle]) -> bool {
        if !self.core.is_long() {
            return false;
        }

        if self.core.stop_loss_triggered(price) {
            return true;
        }

        let Some((mean, _)) = Self::bands(history) else {
            return false;
        };

        if price.to_f64().map(|p| p >= mean).unwrap_or(false) {
            return true;
        }

        self.core.profit_target_reached(price)
    }
}
