//! Yahoo Finance market data client
//!
//! Pulls quote info plus price history from the chart endpoint and
//! headlines from the search endpoint. Both payloads are tolerant of
//! missing fields: anything the provider omits stays `None` rather than
//! being collapsed to zero.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::{Candle, MarketSnapshot, NewsItem, SymbolInfo, Timeframe};
use crate::error::{BotError, Result};
use crate::provider::MarketDataProvider;

/// Default Yahoo Finance API host
pub const YAHOO_API_URL: &str = "https://query1.finance.yahoo.com";

/// Headlines requested per symbol
const NEWS_COUNT: usize = 8;

/// Yahoo rejects requests without a browser-looking user agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) papertrader/0.1";

pub struct YahooFinanceClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_chart(&self, symbol: &str, timeframe: Timeframe) -> Result<ChartResult> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let response: ChartResponse = self
            .client
            .get(&url)
            .query(&[("range", timeframe.range()), ("interval", timeframe.interval())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.chart.error {
            return Err(BotError::FetchFailed(format!(
                "{}: {}",
                symbol,
                err.description.unwrap_or_else(|| err.code.unwrap_or_default())
            )));
        }

        response
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| BotError::FetchFailed(format!("{}: empty chart result", symbol)))
    }

    async fn fetch_news(&self, symbol: &str) -> Result<Vec<NewsItem>> {
        let url = format!("{}/v1/finance/search", self.base_url);
        let response: SearchResponse = self
            .client
            .get(&url)
            .query(&[("q", symbol), ("newsCount", &NEWS_COUNT.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let news = response
            .news
            .into_iter()
            .filter(|item| !item.title.is_empty())
            .map(|item| NewsItem {
                title: item.title,
                publisher: item.publisher,
                link: item.link,
                published: item
                    .provider_publish_time
                    .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            })
            .collect();

        Ok(news)
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn fetch_bundle(&self, symbol: &str, timeframe: Timeframe) -> Result<MarketSnapshot> {
        let chart = self.fetch_chart(symbol, timeframe).await?;

        // Headlines are best-effort; a quote without news is still usable.
        let news = match self.fetch_news(symbol).await {
            Ok(news) => news,
            Err(e) => {
                debug!("News fetch failed for {}: {}", symbol, e);
                Vec::new()
            }
        };

        let info = SymbolInfo {
            symbol: chart.meta.symbol.clone().unwrap_or_else(|| symbol.to_string()),
            price: chart.meta.regular_market_price.and_then(Decimal::from_f64),
            previous_close: chart
                .meta
                .chart_previous_close
                .and_then(Decimal::from_f64),
            volume: chart.meta.regular_market_volume,
            currency: chart.meta.currency.clone(),
        };

        Ok(MarketSnapshot {
            history: chart.into_candles(),
            news,
            info,
        })
    }
}

// ==================== API response types ====================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Vec<ChartResult>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
    #[serde(default)]
    regular_market_volume: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

impl ChartResult {
    /// Flatten the columnar chart payload into candles, skipping rows
    /// where the provider reported no close (untraded bars come back as
    /// nulls).
    fn into_candles(self) -> Vec<Candle> {
        let quote = match self.indicators.quote.into_iter().next() {
            Some(quote) => quote,
            None => return Vec::new(),
        };

        let mut candles = Vec::with_capacity(self.timestamp.len());
        for (i, secs) in self.timestamp.iter().enumerate() {
            let close = quote.close.get(i).copied().flatten();
            let (timestamp, close) = match (DateTime::from_timestamp(*secs, 0), close) {
                (Some(ts), Some(close)) => (ts, close),
                _ => continue,
            };

            let close = match Decimal::from_f64(close) {
                Some(close) => close,
                None => continue,
            };
            let field = |column: &[Option<f64>]| {
                column
                    .get(i)
                    .copied()
                    .flatten()
                    .and_then(Decimal::from_f64)
                    .unwrap_or(close)
            };

            candles.push(Candle {
                timestamp,
                open: field(&quote.open),
                high: field(&quote.high),
                low: field(&quote.low),
                close,
                volume: quote.volume.get(i).copied().flatten(),
            });
        }
        candles
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchNewsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchNewsItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    provider_publish_time: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_payload_flattens_and_skips_null_rows() {
        let raw = serde_json::json!({
            "meta": {
                "symbol": "AAPL",
                "currency": "USD",
                "regularMarketPrice": 187.25,
                "chartPreviousClose": 185.0,
                "regularMarketVolume": 1_000_000u64
            },
            "timestamp": [1_700_000_000, 1_700_086_400, 1_700_172_800],
            "indicators": {
                "quote": [{
                    "open": [184.0, null, 186.5],
                    "high": [185.5, null, 188.0],
                    "low": [183.0, null, 186.0],
                    "close": [185.0, null, 187.25],
                    "volume": [900_000u64, null, 1_000_000u64]
                }]
            }
        });

        let result: ChartResult = serde_json::from_value(raw).unwrap();
        let candles = result.into_candles();

        // the all-null middle row is dropped
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].close, Decimal::from_f64(187.25).unwrap());
        assert_eq!(candles[0].volume, Some(900_000));
    }

    #[test]
    fn missing_meta_fields_stay_none() {
        let raw = serde_json::json!({
            "meta": { "symbol": "AAPL" },
            "timestamp": [],
            "indicators": { "quote": [] }
        });

        let result: ChartResult = serde_json::from_value(raw).unwrap();
        assert!(result.meta.regular_market_price.is_none());
        assert!(result.meta.regular_market_volume.is_none());
        assert!(result.into_candles().is_empty());
    }
}
