//! Momentum strategy: enter on strong upward momentum, exit when the
//! signal weakens or reverses.

use rust_decimal::Decimal;

use crate::domain::Candle;
use crate::strategy::traits::{mean_close, Strategy, StrategyCore, StrategyParams};
use crate::strategy::StrategyKind;

const SHORT_WINDOW: usize = 5;
const LONG_WINDOW: usize = 10;

pub struct MomentumStrategy {
    core: StrategyCore,
}

impl MomentumStrategy {
    pub fn new(params: StrategyParams) -> Self {
        Self {
            core: StrategyCore::new(params),
        }
    }

    fn momentum(history: &[Candle]) -> Option<(Decimal, Decimal)> {
        let sma_short = mean_close(history, SHORT_WINDOW)?;
        let sma_long = mean_close(history, LONG_WINDOW)?;
        Some(((sma_short - sma_long) / sma_long, sma_short))
    }
}

impl Strategy for MomentumStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Momentum
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

        let Some((momentum, sma_short)) = Self::momentum(history) else {
            return false;
        };

        // Short MA above long MA by more than the threshold, and price
        // confirming above the short MA.
        momentum > self.core.params.entry_threshold && price > sma_short
    }

    fn should_sell(&mut self, price: Decimal, history: &[Candle]) -> bool {
        if !self.core.is_long() {
            return false;
        }

        if self.core.stop_loss_triggered(price) {
            return true;
        }

        let Some((momentum, sma_short)) = Self::momentum(history) else {
            return false;
        };

        if self.core.profit_target_reached(price) {
            return true;
        }

        momentum < Decimal::ZERO || price < sma_short
    }
}
