//! Trend indicators: SMA, EMA, crossovers

pub mod crossover;
pub mod ema;
pub mod ma;

pub use crossover::*;
pub use ema::*;
pub use ma::*;
