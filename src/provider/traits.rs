use async_trait::async_trait;

use crate::domain::{MarketSnapshot, Timeframe};
use crate::error::Result;

/// External market data source consumed by the gateway.
///
/// One call retrieves quote info, price history, and news together so a
/// cache miss costs a single provider round trip.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_bundle(&self, symbol: &str, timeframe: Timeframe) -> Result<MarketSnapshot>;
}
