//! Grid trading strategy: a symmetric ladder of price rungs anchored at
//! the first observed price. Buys near rungs below the anchor, sells
//! when price reaches a rung above the entry.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::domain::Candle;
use crate::strategy::traits::{Strategy, StrategyCore, StrategyParams};
use crate::strategy::StrategyKind;

/// Rungs on each side of the anchor; the ladder holds `2*LEVELS + 1`.
const LEVELS: i64 = 5;
/// Relative spacing between adjacent rungs.
const SPACING: Decimal = dec!(0.01);
/// How close price must come to a rung to count as touching it.
const RUNG_TOLERANCE: Decimal = dec!(0.001);

pub struct GridStrategy {
    core: StrategyCore,
    anchor: Option<Decimal>,
    rungs: Vec<Decimal>,
}

impl GridStrategy {
    pub fn new(params: StrategyParams) -> Self {
        Self {
            core: StrategyCore::new(params),
            anchor: None,
            rungs: Vec::new(),
        }
    }

    /// Anchor the ladder around the first observed price. Called once;
    /// the grid stays fixed for the life of the instance.
    fn anchor_grid(&mut self, base_price: Decimal) {
        self.anchor = Some(base_price);
        self.rungs = (-LEVELS..=LEVELS)
            .map(|i| base_price * (Decimal::ONE + Decimal::from(i) * SPACING))
            .collect();
        debug!("Grid anchored at {} with {} rungs", base_price, self.rungs.len());
    }

    fn near_rung(price: Decimal, rung: Decimal) -> bool {
        ((price - rung) / rung).abs() < RUNG_TOLERANCE
    }

    #[cfg(test)]
    pub(crate) fn anchor(&self) -> Option<Decimal> {
        self.anchor
    }
}

impl Strategy for GridStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Grid
    }

    fn core(&self) -> &StrategyCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StrategyCore {
        &mut self.core
    }

    fn should_buy(&mut self, price: Decimal, _history: &[Candle]) -> bool {
        if self.core.is_long() {
            return false;
        }

        if self.rungs.is_empty() {
            self.anchor_grid(price);
        }
        let Some(anchor) = self.anchor else {
            return false;
        };

        self.rungs
            .iter()
            .filter(|rung| **rung < anchor)
            .any(|rung| Self::near_rung(price, *rung))
    }

    fn should_sell(&mut self, price: Decimal, _history: &[Candle]) -> bool {
        if !self.core.is_long() {
            return false;
        }

        if self.core.stop_loss_triggered(price) {
            return true;
        }

        let Some(entry) = self.core.entry_price() else {
            return false;
        };

        self.rungs
            .iter()
            .filter(|rung| **rung > entry)
            .any(|rung| Self::near_rung(price, *rung))
    }
}
