use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Universe scanner survivor. Unique per (code, as_of_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanCandidate {
    pub code: String,
    pub name: String,
    pub as_of_date: NaiveDate,
    pub close_price: f64,
    pub long_ma: f64,
    pub volume: f64,
    pub vol_ma: f64,
}

/// Pool filter survivor. Unique per (code, as_of_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolCandidate {
    pub code: String,
    pub name: String,
    pub as_of_date: NaiveDate,
    pub short_vol_ma: Option<f64>,
    pub long_vol_ma: Option<f64>,
    pub golden_cross: bool,
    pub momentum_status: String,
}

/// A detected sharp-up bar. Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitEvent {
    pub date: NaiveDate,
    pub price: f64,
    pub volume: f64,
    /// Position of the bar in the series it was detected in
    pub index: usize,
}
