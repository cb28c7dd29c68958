//! Single-bar shape ratios

/// `(current - previous) / previous`, 0 when `previous` is 0
pub fn price_change_ratio(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous
}

/// Upper wick relative to the open, 0 when `high == open`
pub fn upper_shadow_ratio(open: f64, high: f64, close: f64) -> f64 {
    if high == open || open == 0.0 {
        return 0.0;
    }
    (high - open.max(close)) / open
}

/// Lower wick relative to the open, 0 when `low == open`
pub fn lower_shadow_ratio(open: f64, low: f64, close: f64) -> f64 {
    if low == open || open == 0.0 {
        return 0.0;
    }
    (open.min(close) - low) / open
}

/// Close-to-close gain at or above `threshold`. The open is accepted for
/// signature parity with the limit-down check but does not participate.
pub fn is_sharp_up_move(_open: f64, close: f64, previous_close: f64, threshold: f64) -> bool {
    if previous_close == 0.0 {
        return false;
    }
    (close - previous_close) / previous_close >= threshold
}

pub fn is_sharp_down_move(_open: f64, close: f64, previous_close: f64, threshold: f64) -> bool {
    if previous_close == 0.0 {
        return false;
    }
    (close - previous_close) / previous_close <= -threshold
}

/// Volume multiple versus the previous bar, 0 when the previous volume is not positive
pub fn volume_ratio(current: f64, previous: f64) -> f64 {
    if previous <= 0.0 {
        return 0.0;
    }
    current / previous
}
