pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod provider;
pub mod services;
pub mod strategy;
pub mod supervisor;

pub use config::AppConfig;
pub use domain::{
    Candle, MarketSnapshot, NewsItem, PortfolioReport, Position, PriceTick, SymbolInfo, Timeframe,
    Trade, TradeSide,
};
pub use error::{BotError, Result};
pub use gateway::{CacheStats, MarketDataGateway};
pub use ledger::SimulatedLedger;
pub use provider::{MarketDataProvider, YahooFinanceClient};
pub use services::{CacheWarmer, PriceStreamer};
pub use strategy::{build_strategy, parse_strategy_kind, Strategy, StrategyKind, StrategyParams};
pub use supervisor::{BotConfig, BotRecord, BotSupervisor};
