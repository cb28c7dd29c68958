//! MACD (Moving Average Convergence Divergence) indicator

use crate::indicators::trend::exponential_moving_average;
use crate::models::indicators::MacdSeries;

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// MACD = EMA(fast) - EMA(slow)
/// Signal = EMA(signal) of MACD
/// Histogram = MACD - Signal
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let fast_ema = exponential_moving_average(closes, fast);
    let slow_ema = exponential_moving_average(closes, slow);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = exponential_moving_average(&macd_line, signal);
    let histogram = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    MacdSeries {
        macd_line,
        signal_line,
        histogram,
    }
}

/// MACD with default periods (12, 26, 9)
pub fn macd_default(closes: &[f64]) -> MacdSeries {
    macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL)
}
