use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Market data API host
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    /// Total per-request timeout; keeps a hung provider call from
    /// pinning a fetch permit indefinitely.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_provider_url() -> String {
    crate::provider::YAHOO_API_URL.to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Seconds a cached snapshot stays valid
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Simultaneous outbound provider fetches, process-wide
    #[serde(default = "default_max_fetches")]
    pub max_concurrent_fetches: usize,
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_max_fetches() -> usize {
    5
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            max_concurrent_fetches: default_max_fetches(),
        }
    }
}

impl GatewayConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Seconds between bot evaluation iterations
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Seconds between streamed price events
    #[serde(default = "default_stream_interval")]
    pub stream_interval_secs: u64,
    /// Symbols the cache warmer keeps fresh
    #[serde(default = "default_warm_symbols")]
    pub warm_symbols: Vec<String>,
    /// How long before TTL expiry the warmer re-fetches
    #[serde(default = "default_warm_lead")]
    pub warm_lead_secs: u64,
}

fn default_tick_interval() -> u64 {
    10
}

fn default_stream_interval() -> u64 {
    5
}

fn default_warm_symbols() -> Vec<String> {
    ["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "NFLX"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_warm_lead() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            stream_interval_secs: default_stream_interval(),
            warm_symbols: default_warm_symbols(),
            warm_lead_secs: default_warm_lead(),
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn stream_interval(&self) -> Duration {
        Duration::from_secs(self.stream_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PAPERTRADER_ENV")
                        .unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (PAPERTRADER_GATEWAY__CACHE_TTL_SECS, etc.)
            .add_source(
                Environment::with_prefix("PAPERTRADER")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.gateway.cache_ttl_secs == 0 {
            errors.push("gateway.cache_ttl_secs must be positive".to_string());
        }

        if self.gateway.max_concurrent_fetches == 0 {
            errors.push("gateway.max_concurrent_fetches must be at least 1".to_string());
        }

        if self.engine.tick_interval_secs == 0 {
            errors.push("engine.tick_interval_secs must be positive".to_string());
        }

        if self.engine.warm_lead_secs >= self.gateway.cache_ttl_secs {
            errors.push(
                "engine.warm_lead_secs must be smaller than gateway.cache_ttl_secs".to_string(),
            );
        }

        if self.provider.request_timeout_secs == 0 {
            errors.push("provider.request_timeout_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            gateway: GatewayConfig::default(),
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
