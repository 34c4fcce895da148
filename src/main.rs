use clap::{Parser, Subcommand};
use papertrader::config::AppConfig;
use papertrader::domain::Timeframe;
use papertrader::error::{BotError, Result};
use papertrader::gateway::MarketDataGateway;
use papertrader::provider::YahooFinanceClient;
use papertrader::services::{CacheWarmer, PriceStreamer};
use papertrader::supervisor::{BotConfig, BotSupervisor};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "papertrader", version, about = "Simulated trading bots against live market data")]
struct Cli {
    /// Configuration directory
    #[arg(long, default_value = "config")]
    config_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine: cache warmer, price streamer, and optionally one bot
    Run {
        /// Start a bot on this symbol at launch
        #[arg(long)]
        symbol: Option<String>,
        /// Strategy kind for the launched bot
        #[arg(long, default_value = "momentum")]
        strategy: String,
        /// Capital for the launched bot
        #[arg(long, default_value = "10000")]
        capital: Decimal,
        #[arg(long, default_value = "0.02")]
        entry_threshold: Decimal,
        #[arg(long, default_value = "0.03")]
        exit_threshold: Decimal,
        #[arg(long, default_value = "-0.05", allow_negative_numbers = true)]
        stop_loss: Decimal,
    },
    /// Print the current quote for a symbol
    Quote {
        symbol: String,
        #[arg(long, default_value = "1d")]
        timeframe: Timeframe,
    },
    /// Print price history for a symbol
    History {
        symbol: String,
        #[arg(long, default_value = "1d")]
        timeframe: Timeframe,
    },
    /// Print latest headlines for a symbol
    News { symbol: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir)?;
    init_logging(&config);
    if let Err(errors) = config.validate() {
        for error in &errors {
            warn!("Config: {}", error);
        }
        return Err(BotError::Internal("invalid configuration".to_string()));
    }

    let provider = Arc::new(YahooFinanceClient::new(
        &config.provider.base_url,
        config.provider.request_timeout(),
    )?);
    let gateway = Arc::new(MarketDataGateway::new(
        provider,
        config.gateway.max_concurrent_fetches,
        config.gateway.cache_ttl(),
    ));

    match cli.command {
        Commands::Run {
            symbol,
            strategy,
            capital,
            entry_threshold,
            exit_threshold,
            stop_loss,
        } => {
            run_engine(
                &config,
                gateway,
                symbol.map(|symbol| BotConfig {
                    symbol,
                    strategy,
                    capital,
                    entry_threshold,
                    exit_threshold,
                    stop_loss,
                    timeframe: Timeframe::Daily,
                }),
            )
            .await
        }
        Commands::Quote { symbol, timeframe } => show_quote(&gateway, &symbol, timeframe).await,
        Commands::History { symbol, timeframe } => show_history(&gateway, &symbol, timeframe).await,
        Commands::News { symbol } => show_news(&gateway, &symbol).await,
    }
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_engine(
    config: &AppConfig,
    gateway: Arc<MarketDataGateway>,
    bootstrap: Option<BotConfig>,
) -> Result<()> {
    let supervisor = Arc::new(BotSupervisor::new(
        Arc::clone(&gateway),
        config.engine.tick_interval(),
    ));

    let warmer = Arc::new(CacheWarmer::new(
        Arc::clone(&gateway),
        config.engine.warm_symbols.clone(),
        std::time::Duration::from_secs(config.engine.warm_lead_secs),
    ));
    let warmer_task = warmer.spawn();

    let streamer = Arc::new(PriceStreamer::new(
        Arc::clone(&supervisor),
        Arc::clone(&gateway),
        config.engine.stream_interval(),
    ));
    let mut ticks = streamer.subscribe();
    let streamer_task = Arc::clone(&streamer).spawn();

    // surface streamed ticks in the log
    let tick_task = tokio::spawn(async move {
        while let Ok(tick) = ticks.recv().await {
            info!("{} {} @ ${}", tick.bot_id, tick.symbol, tick.price);
        }
    });

    if let Some(bot_config) = bootstrap {
        let bot_id = supervisor.start(bot_config).await?;
        info!("Bootstrap bot started: {}", bot_id);
    }

    info!("Engine running, press ctrl-c to stop");
    signal::ctrl_c().await?;
    info!("Shutting down");

    supervisor.stop_all().await;
    warmer_task.abort();
    streamer_task.abort();
    tick_task.abort();

    Ok(())
}

async fn show_quote(
    gateway: &MarketDataGateway,
    symbol: &str,
    timeframe: Timeframe,
) -> Result<()> {
    let snapshot = gateway.fetch(symbol, timeframe, true).await?;
    let info = &snapshot.info;

    println!("{}", info.symbol);
    match info.price {
        Some(price) => println!("  price:          {}", price),
        None => println!("  price:          unavailable"),
    }
    if let Some(previous_close) = info.previous_close {
        println!("  previous close: {}", previous_close);
    }
    if let Some(volume) = info.volume {
        println!("  volume:         {}", volume);
    }
    println!("  history bars:   {}", snapshot.history.len());
    Ok(())
}

async fn show_history(
    gateway: &MarketDataGateway,
    symbol: &str,
    timeframe: Timeframe,
) -> Result<()> {
    let snapshot = gateway.fetch(symbol, timeframe, true).await?;
    if snapshot.history.is_empty() {
        println!("No history for {}", symbol);
        return Ok(());
    }

    for candle in &snapshot.history {
        println!(
            "{}  open {}  high {}  low {}  close {}",
            candle.timestamp.format("%Y-%m-%d %H:%M"),
            candle.open,
            candle.high,
            candle.low,
            candle.close
        );
    }
    Ok(())
}

async fn show_news(gateway: &MarketDataGateway, symbol: &str) -> Result<()> {
    let snapshot = gateway.fetch(symbol, Timeframe::Daily, true).await?;
    if snapshot.news.is_empty() {
        println!("No news for {}", symbol);
        return Ok(());
    }

    for item in &snapshot.news {
        let publisher = item.publisher.as_deref().unwrap_or("unknown");
        println!("[{}] {}", publisher, item.title);
        if let Some(link) = &item.link {
            println!("  {}", link);
        }
    }
    Ok(())
}
