//! Breakout strategy: buy when price clears the lookback high, exit
//! when it breaks the lookback low or hits the profit target.

use rust_decimal::Decimal;

use crate::domain::Candle;
use crate::strategy::traits::{Strategy, StrategyCore, StrategyParams};
use crate::strategy::StrategyKind;

const LOOKBACK: usize = 20;

pub struct BreakoutStrategy {
    core: StrategyCore,
}

impl BreakoutStrategy {
    pub fn new(params: StrategyParams) -> Self {
        Self {
            core: StrategyCore::new(params),
        }
    }

    fn window(history: &[Candle]) -> Option<&[Candle]> {
        if history.len() < LOOKBACK {
            return None;
        }
        Some(&history[history.len() - LOOKBACK..])
    }

    fn resistance(history: &[Candle]) -> Option<Decimal> {
        Self::window(history)?.iter().map(|c| c.high).max()
    }

    fn support(history: &[Candle]) -> Option<Decimal> {
        Self::window(history)?.iter().map(|c| c.low).min()
    }
}

impl Strategy for BreakoutStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Breakout
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

        let Some(resistance) = Self::resistance(history) else {
            return false;
        };

        price > resistance * (Decimal::ONE + self.core.params.entry_threshold)
    }

    fn should_sell(&mut self, price: Decimal, history: &[Candle]) -> bool {
        if !self.core.is_long() {
            return false;
        }

        if self.core.stop_loss_triggered(price) {
            return true;
        }

        let Some(support) = Self::support(history) else {
            return false;
        };

        if self.core.profit_target_reached(price) {
            return true;
        }

        price < support * (Decimal::ONE - self.core.params.entry_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn params() -> StrategyParams {
        StrategyParams {
            capital: dec!(10000),
            entry_threshold: dec!(0.02),
            exit_threshold: dec!(0.03),
            stop_loss: dec!(-0.05),
        }
    }

    /// 20 flat bars: high 105, low 95, close 100.
    fn ranging() -> Vec<Candle> {
        (0..20)
            .map(|_| Candle {
                timestamp: Utc::now(),
                open: dec!(100),
                high: dec!(105),
                low: dec!(95),
                close: dec!(100),
                volume: None,
            })
            .collect()
    }

    #[test]
    fn buys_only_beyond_the_resistance_margin() {
        let mut strategy = BreakoutStrategy::new(params());
        let history = ranging();

        // breakout level = 105 * 1.02 = 107.1
        assert!(strategy.should_buy(dec!(107.2), &history));
        assert!(!strategy.should_buy(dec!(106), &history));
        assert!(!strategy.should_buy(dec!(107.2), &history[..10].to_vec()));
    }

    #[test]
    fn sells_below_the_support_margin() {
        let mut strategy = BreakoutStrategy::new(params());
        strategy.core_mut().open_position(10, dec!(96));
        let history = ranging();

        // breakdown level = 95 * 0.98 = 93.1
        assert!(strategy.should_sell(dec!(93), &history));
        assert!(!strategy.should_sell(dec!(94), &history));
    }

    #[test]
    fn sells_on_profit_target_inside_the_range() {
        let mut strategy = BreakoutStrategy::new(params());
        strategy.core_mut().open_position(10, dec!(97));
        let history = ranging();

        // +3.1% from entry, still below resistance
        assert!(strategy.should_sell(dec!(100), &history));
    }

    #[test]
    fn stop_loss_takes_precedence() {
        let mut strategy = BreakoutStrategy::new(params());
        strategy.core_mut().open_position(10, dec!(100));

        assert!(strategy.should_sell(dec!(94), &ranging()));
    }
}
