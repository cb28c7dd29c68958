//! Most-recent unbroken run detection

/// Walk back from the newest point counting bars that are strictly positive
/// and strictly above their predecessor; stop at the first violation.
///
/// Returns the run length when it reaches `min_days`, else 0. A series with
/// fewer than `min_days + 1` points yields 0.
pub fn consecutive_increasing_positive_streak(series: &[f64], min_days: usize) -> usize {
    if series.len() < min_days + 1 {
        return 0;
    }

    let run = (1..series.len())
        .rev()
        .take_while(|&i| series[i] > 0.0 && series[i] > series[i - 1])
        .count();

    if run >= min_days {
        run
    } else {
        0
    }
}
