pub mod breakout;
pub mod factory;
pub mod grid;
pub mod mean_reversion;
pub mod momentum;
pub mod traits;

pub use breakout::BreakoutStrategy;
pub use factory::{build_strategy, parse_strategy_kind, StrategyKind};
pub use grid::GridStrategy;
pub use mean_reversion::MeanReversionStrategy;
pub use momentum::MomentumStrategy;
pub use traits::{Strategy, StrategyCore, StrategyParams};
