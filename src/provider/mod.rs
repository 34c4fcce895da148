pub mod traits;
pub mod yahoo;

pub use traits::MarketDataProvider;
pub use yahoo::{YahooFinanceClient, YAHOO_API_URL};
