mod common;

use common::ScriptedProvider;
use papertrader::domain::TradeSide;
use papertrader::error::BotError;
use papertrader::gateway::MarketDataGateway;
use papertrader::services::PriceStreamer;
use papertrader::supervisor::{BotConfig, BotSupervisor};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(10);

/// Short TTL so every loop iteration goes back to the provider.
fn supervisor(provider: Arc<ScriptedProvider>) -> Arc<BotSupervisor> {
    let gateway = Arc::new(MarketDataGateway::new(
        provider,
        5,
        Duration::from_millis(5),
    ));
    Arc::new(BotSupervisor::new(gateway, TICK))
}

fn momentum_config(symbol: &str) -> BotConfig {
    BotConfig {
        symbol: symbol.to_string(),
        strategy: "momentum".to_string(),
        capital: dec!(10000),
        entry_threshold: dec!(0.02),
        exit_threshold: dec!(0.03),
        stop_loss: dec!(-0.05),
        timeframe: Default::default(),
    }
}

#[tokio::test]
async fn unknown_strategy_is_rejected_before_any_fetch() {
    let provider = Arc::new(ScriptedProvider::rising());
    let supervisor = supervisor(provider.clone());

    let mut config = momentum_config("AAPL");
    config.strategy = "astrology".to_string();
    let err = supervisor.start(config).await.unwrap_err();

    assert!(matches!(err, BotError::UnknownStrategy(_)));
    assert_eq!(provider.calls(), 0);
    assert_eq!(supervisor.bot_count().await, 0);
}

#[tokio::test]
async fn unresolvable_symbol_registers_no_bot() {
    let provider = Arc::new(ScriptedProvider::rising());
    provider.set_failing(true);
    let supervisor = supervisor(provider.clone());

    let err = supervisor.start(momentum_config("NOPE")).await.unwrap_err();

    assert!(matches!(err, BotError::InvalidSymbol(_)));
    assert_eq!(supervisor.bot_count().await, 0);
    assert!(supervisor.list_active().await.is_empty());
}

#[tokio::test]
async fn momentum_bot_opens_one_position_and_holds() {
    let provider = Arc::new(ScriptedProvider::rising());
    let supervisor = supervisor(provider.clone());

    let bot_id = supervisor.start(momentum_config("aapl")).await.unwrap();
    assert!(bot_id.starts_with("bot_AAPL_"));

    let records = supervisor.list_active().await;
    assert_eq!(records.len(), 1);
    assert!(records[0].active);
    assert_eq!(records[0].config.symbol, "AAPL");

    // Let several evaluation ticks run; the entry signal holds steady,
    // so exactly one buy should be placed and then held.
    tokio::time::sleep(Duration::from_millis(120)).await;

    let report = supervisor.get_portfolio(&bot_id).await.unwrap();
    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].side, TradeSide::Buy);
    assert_eq!(report.trades[0].quantity, 90);
    assert_eq!(report.trades[0].price, dec!(111));

    // 90 shares at 111 cost 9990, leaving 10 cash; marked at the same
    // price the equity is back at the initial capital.
    assert_eq!(report.cash, dec!(10));
    assert_eq!(report.equity, dec!(10000));
    assert_eq!(report.profit_loss, Decimal::ZERO);

    supervisor.stop(&bot_id).await.unwrap();
}

#[tokio::test]
async fn stop_terminates_the_loop_and_removes_the_record() {
    let provider = Arc::new(ScriptedProvider::rising());
    let supervisor = supervisor(provider.clone());

    let bot_id = supervisor.start(momentum_config("AAPL")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    supervisor.stop(&bot_id).await.unwrap();

    assert!(supervisor.list_active().await.is_empty());
    assert_eq!(supervisor.bot_count().await, 0);
    assert!(matches!(
        supervisor.get_portfolio(&bot_id).await,
        Err(BotError::BotNotFound(_))
    ));

    // The evaluation loop is joined before stop returns, so the call
    // count must be frozen afterwards.
    let calls = provider.calls();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(provider.calls(), calls);

    assert!(matches!(
        supervisor.stop(&bot_id).await,
        Err(BotError::BotNotFound(_))
    ));
}

#[tokio::test]
async fn stop_all_clears_every_bot() {
    let provider = Arc::new(ScriptedProvider::rising());
    let supervisor = supervisor(provider.clone());

    supervisor.start(momentum_config("AAPL")).await.unwrap();
    supervisor.start(momentum_config("MSFT")).await.unwrap();
    assert_eq!(supervisor.bot_count().await, 2);

    supervisor.stop_all().await;
    assert_eq!(supervisor.bot_count().await, 0);
}

#[tokio::test]
async fn zero_price_skips_evaluation_without_trading() {
    let provider = Arc::new(ScriptedProvider::rising());
    let supervisor = supervisor(provider.clone());

    provider.set_price(Decimal::ZERO);
    let bot_id = supervisor.start(momentum_config("AAPL")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let report = supervisor.get_portfolio(&bot_id).await.unwrap();
    assert!(report.trades.is_empty());
    assert_eq!(report.cash, dec!(10000));

    let records = supervisor.list_active().await;
    assert!(records[0].active);

    supervisor.stop(&bot_id).await.unwrap();
}

#[tokio::test]
async fn streamer_publishes_ticks_for_active_bots() {
    let provider = Arc::new(ScriptedProvider::rising());
    let supervisor = supervisor(provider.clone());
    let gateway = Arc::new(MarketDataGateway::new(
        provider.clone(),
        5,
        Duration::from_secs(300),
    ));
    let streamer = PriceStreamer::new(supervisor.clone(), gateway, Duration::from_secs(5));

    let bot_id = supervisor.start(momentum_config("AAPL")).await.unwrap();

    let mut rx = streamer.subscribe();
    streamer.stream_once().await;

    let tick = rx.try_recv().unwrap();
    assert_eq!(tick.bot_id, bot_id);
    assert_eq!(tick.symbol, "AAPL");
    assert_eq!(tick.price, dec!(111));

    supervisor.stop(&bot_id).await.unwrap();

    streamer.stream_once().await;
    assert!(rx.try_recv().is_err());
}
