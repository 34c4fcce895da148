use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Analysis horizon controlling how far back and at what granularity
/// history is requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Minute,
    Hourly,
    Daily,
    Weekly,
}

impl Timeframe {
    pub const ALL: [Timeframe; 4] = [
        Timeframe::Minute,
        Timeframe::Hourly,
        Timeframe::Daily,
        Timeframe::Weekly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Minute => "1m",
            Timeframe::Hourly => "1h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
        }
    }

    /// Lookback range requested from the provider for this timeframe.
    pub fn range(&self) -> &'static str {
        match self {
            Timeframe::Minute => "7d",
            Timeframe::Hourly => "5d",
            Timeframe::Daily => "1mo",
            Timeframe::Weekly => "3mo",
        }
    }

    /// Bar granularity requested from the provider for this timeframe.
    pub fn interval(&self) -> &'static str {
        match self {
            Timeframe::Minute => "1m",
            Timeframe::Hourly => "1h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1d",
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::Daily
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = &'static str;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1m" | "minute" => Ok(Timeframe::Minute),
            "1h" | "hourly" => Ok(Timeframe::Hourly),
            "1d" | "daily" => Ok(Timeframe::Daily),
            "1w" | "weekly" => Ok(Timeframe::Weekly),
            _ => Err("invalid timeframe; expected 1m|1h|1d|1w"),
        }
    }
}

/// One historical price bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Option<u64>,
}

/// Quote-level facts about a symbol.
///
/// Fields the provider may omit are `Option` so "missing" stays
/// distinguishable from zero at every consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    /// Last traded price, if the provider reported one.
    pub price: Option<Decimal>,
    pub previous_close: Option<Decimal>,
    pub volume: Option<u64>,
    pub currency: Option<String>,
}

impl SymbolInfo {
    /// Current price, rejecting zero/negative values the provider
    /// sometimes reports for halted or unknown symbols.
    pub fn valid_price(&self) -> Option<Decimal> {
        self.price.filter(|p| *p > Decimal::ZERO)
    }
}

/// A news headline attached to a symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub publisher: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

/// Everything one provider round trip yields for a (symbol, timeframe)
/// pair: quote info, price history, and headlines, fetched together to
/// avoid three round trips per symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub info: SymbolInfo,
    pub history: Vec<Candle>,
    pub news: Vec<NewsItem>,
}

/// Price event pushed to streaming listeners for each active bot.
#[derive(Debug, Clone, Serialize)]
pub struct PriceTick {
    pub bot_id: String,
    pub symbol: String,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}
