use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{BotError, Result};
use crate::strategy::breakout::BreakoutStrategy;
use crate::strategy::grid::GridStrategy;
use crate::strategy::mean_reversion::MeanReversionStrategy;
use crate::strategy::momentum::MomentumStrategy;
use crate::strategy::traits::{Strategy, StrategyParams};

/// The closed set of trading styles. Adding a kind is a compile-checked
/// change: every `match` below must be extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Momentum,
    Grid,
    MeanReversion,
    Breakout,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Momentum,
        StrategyKind::Grid,
        StrategyKind::MeanReversion,
        StrategyKind::Breakout,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Momentum => "momentum",
            StrategyKind::Grid => "grid",
            StrategyKind::MeanReversion => "mean_reversion",
            StrategyKind::Breakout => "breakout",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = &'static str;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "momentum" => Ok(StrategyKind::Momentum),
            "grid" => Ok(StrategyKind::Grid),
            "mean_reversion" => Ok(StrategyKind::MeanReversion),
            "breakout" => Ok(StrategyKind::Breakout),
            _ => Err("invalid strategy; expected momentum|grid|mean_reversion|breakout"),
        }
    }
}

/// Parse a strategy kind from configuration input. Unknown kinds are a
/// configuration error, never a runtime fallback.
pub fn parse_strategy_kind(raw: &str) -> Result<StrategyKind> {
    StrategyKind::from_str(raw).map_err(|_| BotError::UnknownStrategy(raw.to_string()))
}

/// Build a fresh strategy instance for one bot.
pub fn build_strategy(kind: StrategyKind, params: StrategyParams) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::Momentum => Box::new(MomentumStrategy::new(params)),
        StrategyKind::Grid => Box::new(GridStrategy::new(params)),
        StrategyKind::MeanReversion => Box::new(MeanReversionStrategy::new(params)),
        StrategyKind::Breakout => Box::new(BreakoutStrategy::new(params)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> StrategyParams {
        StrategyParams {
            capital: dec!(1000),
            entry_threshold: dec!(0.02),
            exit_threshold: dec!(0.03),
            stop_loss: dec!(-0.05),
        }
    }

    #[test]
    fn parses_every_known_kind() {
        for kind in StrategyKind::ALL {
            assert_eq!(parse_strategy_kind(kind.as_str()).unwrap(), kind);
        }
        assert_eq!(
            parse_strategy_kind(" Momentum ").unwrap(),
            StrategyKind::Momentum
        );
    }

    #[test]
    fn unknown_kind_is_a_configuration_error() {
        let err = parse_strategy_kind("arbitrage").unwrap_err();
        assert!(matches!(err, BotError::UnknownStrategy(_)));
    }

    #[test]
    fn factory_builds_matching_instances() {
        for kind in StrategyKind::ALL {
            let strategy = build_strategy(kind, params());
            assert_eq!(strategy.kind(), kind);
            assert!(!strategy.core().is_long());
        }
    }

    #[test]
    fn stop_loss_fires_for_every_kind() {
        for kind in StrategyKind::ALL {
            let mut strategy = build_strategy(kind, params());
            strategy.core_mut().open_position(10, dec!(100));
            assert!(
                strategy.should_sell(dec!(94), &[]),
                "stop-loss did not fire for {}",
                kind
            );
        }
    }
}
