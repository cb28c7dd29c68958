//! Momentum indicators: MACD, histogram streaks

pub mod macd;
pub mod streak;

pub use macd::*;
pub use streak::*;
