//! EMA (Exponential Moving Average) indicator

/// EMA with `alpha = 2 / (period + 1)`, seeded with the first value:
/// `ema[i] = ema[i-1] + alpha * (x[i] - ema[i-1])`
pub fn exponential_moving_average(series: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(series.len());

    let mut iter = series.iter();
    let Some(&first) = iter.next() else {
        return out;
    };
    let mut prev = first;
    out.push(prev);

    for &x in iter {
        prev += alpha * (x - prev);
        out.push(prev);
    }

    out
}
