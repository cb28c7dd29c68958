//! Limitflag: a multi-stage equity screening pipeline.
//!
//! Universe scan (weekly trend + volume) feeds the pool filter (daily
//! volume golden cross + 120-minute MACD momentum), which feeds the
//! pattern recognizer (limit-up, contracting flag, breakout candle).
//! Every stage commits a dated snapshot before handing survivors on.

pub mod cache;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod services;

pub use error::{Result, ScreenerError};
