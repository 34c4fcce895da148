//! Core strategy trait and shared position state
//!
//! Every strategy runs the same state machine: flat until `should_buy`
//! fires, long until `should_sell` fires, then flat again. The shared
//! [`StrategyCore`] owns that state plus the sizing and stop-loss rules
//! common to all strategy kinds.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::Candle;
use crate::strategy::StrategyKind;

/// Tunables shared by every strategy kind.
#[derive(Debug, Clone)]
pub struct StrategyParams {
    /// Capital available for position sizing.
    pub capital: Decimal,
    /// Relative signal strength required to enter.
    pub entry_threshold: Decimal,
    /// Unrealized return at which to take profit.
    pub exit_threshold: Decimal,
    /// Negative fractional loss that forces an exit.
    pub stop_loss: Decimal,
}

/// Per-instance position state plus the shared entry/exit arithmetic.
///
/// Owned by exactly one bot's evaluation loop; nothing else mutates it.
#[derive(Debug, Clone)]
pub struct StrategyCore {
    pub params: StrategyParams,
    position: Option<u64>,
    entry_price: Option<Decimal>,
}

impl StrategyCore {
    pub fn new(params: StrategyParams) -> Self {
        Self {
            params,
            position: None,
            entry_price: None,
        }
    }

    pub fn is_long(&self) -> bool {
        self.position.is_some()
    }

    pub fn position(&self) -> Option<u64> {
        self.position
    }

    pub fn entry_price(&self) -> Option<Decimal> {
        self.entry_price
    }

    /// Record a filled entry; moves the state machine to long.
    pub fn open_position(&mut self, quantity: u64, price: Decimal) {
        self.position = Some(quantity);
        self.entry_price = Some(price);
    }

    /// Record a filled exit; moves the state machine back to flat.
    pub fn close_position(&mut self) {
        self.position = None;
        self.entry_price = None;
    }

    /// Shares to buy at `price`: `max(1, floor(capital / price))`.
    pub fn calculate_quantity(&self, price: Decimal) -> u64 {
        let max_shares = (self.params.capital / price)
            .floor()
            .to_u64()
            .unwrap_or(0);
        max_shares.max(1)
    }

    /// Unrealized fractional return of the open position, if any.
    pub fn unrealized_return(&self, price: Decimal) -> Option<Decimal> {
        let entry = self.entry_price?;
        self.position?;
        Some((price - entry) / entry)
    }

    /// Stop-loss check shared by every strategy; evaluated before any
    /// strategy-specific sell logic.
    pub fn stop_loss_triggered(&self, price: Decimal) -> bool {
        match self.unrealized_return(price) {
            Some(change) => change <= self.params.stop_loss,
            None => false,
        }
    }

    /// Profit-target check against `exit_threshold`.
    pub fn profit_target_reached(&self, price: Decimal) -> bool {
        match self.unrealized_return(price) {
            Some(change) => change >= self.params.exit_threshold,
            None => false,
        }
    }
}

/// A trading style evaluated against current price and history.
///
/// `should_buy` is only meaningful while flat and `should_sell` while
/// long; implementations also guard internally so a misdriven call is a
/// no-op rather than a double entry.
pub trait Strategy: Send {
    fn kind(&self) -> StrategyKind;

    fn core(&self) -> &StrategyCore;

    fn core_mut(&mut self) -> &mut StrategyCore;

    fn should_buy(&mut self, price: Decimal, history: &[Candle]) -> bool;

    fn should_sell(&mut self, price: Decimal, history: &[Candle]) -> bool;
}

/// Mean of the last `n` closes, or `None` with fewer than `n` bars.
pub(crate) fn mean_close(history: &[Candle], n: usize) -> Option<Decimal> {
    if history.len() < n || n == 0 {
        return None;
    }
    let sum: Decimal = history[history.len() - n..]
        .iter()
        .map(|c| c.close)
        .sum();
    Some(sum / Decimal::from(n as u64))
}
