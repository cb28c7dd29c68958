//! Simple moving average

/// Trailing arithmetic mean over `period` points.
///
/// Positions with fewer than `period` predecessors average whatever is
/// available, so the output is always as long as the input and the first
/// point equals the first value. A zero period is treated as 1.
pub fn moving_average(series: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    (0..series.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(period);
            let window = &series[start..=i];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Mean of a slice, `None` when empty
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
