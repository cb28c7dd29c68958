use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stages. The string form doubles as cache-key prefix and metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    UniverseScan,
    PoolFilter,
    /// Sub-check of the pool filter with its own short-lived cache
    VolumeCross,
    PatternRecognition,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::UniverseScan => "universe_scan",
            Stage::PoolFilter => "pool_filter",
            Stage::VolumeCross => "vol_golden_cross",
            Stage::PatternRecognition => "pattern_recognition",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
