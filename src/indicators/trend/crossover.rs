//! Crossover detection between two aligned series

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossDirection {
    /// short goes from <= long to > long
    Golden,
    /// short goes from >= long to < long
    Death,
}

/// Scan the trailing `lookback + 1` paired points oldest to newest and report
/// whether any adjacent pair crosses in `direction`.
///
/// The series are aligned on their most recent point. Returns false when
/// either series is shorter than `lookback + 1` points.
pub fn detect_crossover(
    short: &[f64],
    long: &[f64],
    lookback: usize,
    direction: CrossDirection,
) -> bool {
    let needed = lookback + 1;
    if short.len() < needed || long.len() < needed {
        return false;
    }

    let short = &short[short.len() - needed..];
    let long = &long[long.len() - needed..];

    (0..lookback).any(|i| match direction {
        CrossDirection::Golden => short[i] <= long[i] && short[i + 1] > long[i + 1],
        CrossDirection::Death => short[i] >= long[i] && short[i + 1] < long[i + 1],
    })
}

pub fn detect_golden_cross(short: &[f64], long: &[f64], lookback: usize) -> bool {
    detect_crossover(short, long, lookback, CrossDirection::Golden)
}

pub fn detect_death_cross(short: &[f64], long: &[f64], lookback: usize) -> bool {
    detect_crossover(short, long, lookback, CrossDirection::Death)
}
