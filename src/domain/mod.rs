pub mod market;
pub mod trade;

pub use market::*;
pub use trade::*;
