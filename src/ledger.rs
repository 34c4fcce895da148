//! Simulated ledger for one bot
//!
//! Tracks cash, open positions, and an append-only trade log. Orders
//! execute atomically: a failed precondition leaves every field exactly
//! as it was.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::domain::{PortfolioReport, Position, Trade, TradeSide};
use crate::error::{BotError, Result};

#[derive(Debug, Clone)]
pub struct SimulatedLedger {
    cash: Decimal,
    positions: HashMap<String, Position>,
    trades: Vec<Trade>,
    initial_capital: Decimal,
}

impl SimulatedLedger {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            cash: initial_capital,
            positions: HashMap::new(),
            trades: Vec::new(),
            initial_capital,
        }
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    pub fn positions(&self) -> &HashMap<String, Position> {
        &self.positions
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Buy `quantity` shares at `price`. Requires `cash >= price * quantity`;
    /// on success debits cash, merges into the position at a
    /// capital-weighted average price, and appends a trade record.
    pub fn buy(&mut self, symbol: &str, price: Decimal, quantity: u64) -> Result<Trade> {
        let total_cost = price * Decimal::from(quantity);
        if self.cash < total_cost {
            warn!(
                "Insufficient funds for {} x{} @ ${}: need ${}, have ${}",
                symbol, quantity, price, total_cost, self.cash
            );
            return Err(BotError::InsufficientFunds {
                needed: total_cost,
                available: self.cash,
            });
        }

        self.cash -= total_cost;
        self.positions
            .entry(symbol.to_string())
            .and_modify(|position| {
                let old_qty = Decimal::from(position.quantity);
                let new_qty = old_qty + Decimal::from(quantity);
                position.average_price =
                    (position.average_price * old_qty + total_cost) / new_qty;
                position.quantity += quantity;
            })
            .or_insert(Position {
                quantity,
                average_price: price,
            });

        let trade = self.record_trade(symbol, TradeSide::Buy, price, quantity, total_cost);
        info!(
            "EXECUTED BUY: {} shares of {} at ${} (total ${})",
            quantity, symbol, price, total_cost
        );
        Ok(trade)
    }

    /// Sell `quantity` shares at `price`. Requires an existing position
    /// holding at least `quantity`; on success credits cash, shrinks the
    /// position (removing it at zero), and appends a trade record. The
    /// average price is untouched by sells.
    pub fn sell(&mut self, symbol: &str, price: Decimal, quantity: u64) -> Result<Trade> {
        let held = self.positions.get(symbol).map(|p| p.quantity).unwrap_or(0);
        if held < quantity {
            warn!(
                "Cannot sell {} x{}: only {} held",
                symbol, quantity, held
            );
            return Err(BotError::InsufficientPosition {
                symbol: symbol.to_string(),
                requested: quantity,
                held,
            });
        }

        let total_value = price * Decimal::from(quantity);
        self.cash += total_value;

        if held == quantity {
            self.positions.remove(symbol);
        } else if let Some(position) = self.positions.get_mut(symbol) {
            position.quantity -= quantity;
        }

        let trade = self.record_trade(symbol, TradeSide::Sell, price, quantity, total_value);
        info!(
            "EXECUTED SELL: {} shares of {} at ${} (total ${})",
            quantity, symbol, price, total_value
        );
        Ok(trade)
    }

    fn record_trade(
        &mut self,
        symbol: &str,
        side: TradeSide,
        price: Decimal,
        quantity: u64,
        total: Decimal,
    ) -> Trade {
        let trade = Trade {
            id: format!("T{}", self.trades.len() + 1),
            symbol: symbol.to_string(),
            side,
            price,
            quantity,
            timestamp: Utc::now(),
            total,
        };
        self.trades.push(trade.clone());
        trade
    }

    /// Cash plus the marked value of every position with a supplied
    /// price. Symbols missing from `current_prices` contribute nothing,
    /// a known approximation rather than an error.
    pub fn portfolio_value(&self, current_prices: &HashMap<String, Decimal>) -> Decimal {
        let mut equity = self.cash;
        for (symbol, position) in &self.positions {
            if let Some(price) = current_prices.get(symbol) {
                equity += Decimal::from(position.quantity) * *price;
            }
        }
        equity
    }

    pub fn profit_loss(&self, current_prices: &HashMap<String, Decimal>) -> Decimal {
        self.portfolio_value(current_prices) - self.initial_capital
    }

    pub fn report(&self, current_prices: &HashMap<String, Decimal>) -> PortfolioReport {
        PortfolioReport {
            cash: self.cash,
            equity: self.portfolio_value(current_prices),
            positions: self.positions.clone(),
            trades: self.trades.to_vec(),
            profit_loss: self.profit_loss(current_prices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn buy_debits_cash_and_opens_position() {
        let mut ledger = SimulatedLedger::new(dec!(10000));
        let trade = ledger.buy("AAPL", dec!(100), 10).unwrap();

        assert_eq!(trade.side, TradeSide::Buy);
        assert_eq!(trade.total, dec!(1000));
        assert_eq!(ledger.cash(), dec!(9000));
        let position = ledger.position("AAPL").unwrap();
        assert_eq!(position.quantity, 10);
        assert_eq!(position.average_price, dec!(100));
    }

    #[test]
    fn insufficient_funds_leaves_state_untouched() {
        let mut ledger = SimulatedLedger::new(dec!(500));
        let err = ledger.buy("AAPL", dec!(100), 10).unwrap_err();

        assert!(matches!(err, BotError::InsufficientFunds { .. }));
        assert_eq!(ledger.cash(), dec!(500));
        assert!(ledger.position("AAPL").is_none());
        assert!(ledger.trades().is_empty());
    }

    #[test]
    fn repeat_buys_blend_average_price() {
        let mut ledger = SimulatedLedger::new(dec!(10000));
        ledger.buy("AAPL", dec!(100), 10).unwrap();
        ledger.buy("AAPL", dec!(110), 10).unwrap();

        let position = ledger.position("AAPL").unwrap();
        assert_eq!(position.quantity, 20);
        assert_eq!(position.average_price, dec!(105));
    }

    #[test]
    fn sell_removes_position_at_zero_and_keeps_average_on_partial() {
        let mut ledger = SimulatedLedger::new(dec!(10000));
        ledger.buy("AAPL", dec!(100), 10).unwrap();

        ledger.sell("AAPL", dec!(120), 4).unwrap();
        let position = ledger.position("AAPL").unwrap();
        assert_eq!(position.quantity, 6);
        assert_eq!(position.average_price, dec!(100));

        ledger.sell("AAPL", dec!(120), 6).unwrap();
        assert!(ledger.position("AAPL").is_none());
    }

    #[test]
    fn sell_without_position_is_rejected_without_mutation() {
        let mut ledger = SimulatedLedger::new(dec!(1000));
        let err = ledger.sell("AAPL", dec!(100), 1).unwrap_err();

        assert!(matches!(err, BotError::InsufficientPosition { held: 0, .. }));
        assert_eq!(ledger.cash(), dec!(1000));
        assert!(ledger.trades().is_empty());
    }

    #[test]
    fn buy_then_sell_round_trips_cash() {
        let mut ledger = SimulatedLedger::new(dec!(10000));
        ledger.buy("AAPL", dec!(123.45), 7).unwrap();
        ledger.sell("AAPL", dec!(123.45), 7).unwrap();

        assert_eq!(ledger.cash(), dec!(10000));
        assert_eq!(ledger.trades().len(), 2);
    }

    #[test]
    fn cash_never_goes_negative_over_mixed_sequences() {
        let mut ledger = SimulatedLedger::new(dec!(1000));
        let calls: [(TradeSide, Decimal, u64); 6] = [
            (TradeSide::Buy, dec!(90), 11),  // 990
            (TradeSide::Buy, dec!(90), 1),   // rejected: only 10 left
            (TradeSide::Sell, dec!(80), 20), // rejected: only 11 held
            (TradeSide::Sell, dec!(80), 5),
            (TradeSide::Buy, dec!(400), 1),
            (TradeSide::Sell, dec!(10), 8), // rejected: 7 held
        ];

        for (side, price, qty) in calls {
            let _ = match side {
                TradeSide::Buy => ledger.buy("AAPL", price, qty),
                TradeSide::Sell => ledger.sell("AAPL", price, qty),
            };
            assert!(ledger.cash() >= Decimal::ZERO);
            for position in ledger.positions().values() {
                assert!(position.quantity > 0);
            }
        }
    }

    #[test]
    fn portfolio_value_ignores_unpriced_symbols() {
        let mut ledger = SimulatedLedger::new(dec!(10000));
        ledger.buy("AAPL", dec!(100), 10).unwrap();
        ledger.buy("MSFT", dec!(200), 5).unwrap();

        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), dec!(110));

        // MSFT has no live price and contributes 0
        assert_eq!(ledger.portfolio_value(&prices), dec!(8000) + dec!(1100));
        assert_eq!(ledger.profit_loss(&prices), dec!(-900));
    }
}
