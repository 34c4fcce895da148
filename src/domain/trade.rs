use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Side of a simulated fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A simulated fill. Immutable once appended to the ledger's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub price: Decimal,
    pub quantity: u64,
    pub timestamp: DateTime<Utc>,
    pub total: Decimal,
}

/// An open holding in one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Shares held; always > 0 while the position exists.
    pub quantity: u64,
    /// Capital-weighted mean of all buys into this symbol. Sells do not
    /// change it.
    pub average_price: Decimal,
}

/// Point-in-time view of one bot's ledger, with equity marked against
/// live prices.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioReport {
    pub cash: Decimal,
    pub equity: Decimal,
    pub positions: HashMap<String, Position>,
    pub trades: Vec<Trade>,
    pub profit_loss: Decimal,
}
