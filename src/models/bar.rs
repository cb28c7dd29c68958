use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Weekly,
    Daily,
    #[serde(rename = "120min")]
    Min120,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Weekly => "weekly",
            Granularity::Daily => "daily",
            Granularity::Min120 => "120min",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Granularity::Weekly),
            "daily" => Ok(Granularity::Daily),
            "120min" => Ok(Granularity::Min120),
            other => Err(format!("unknown granularity '{}'", other)),
        }
    }
}

/// How far back from the range end to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookback {
    /// The most recent N bars
    Bars(usize),
    /// Every bar within N calendar days
    Days(i64),
}

/// Window of bars to fetch, ending on (and including) `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRange {
    pub end: NaiveDate,
    pub lookback: Lookback,
}

impl SeriesRange {
    pub fn last_bars(end: NaiveDate, bars: usize) -> Self {
        Self {
            end,
            lookback: Lookback::Bars(bars),
        }
    }

    pub fn last_days(end: NaiveDate, days: i64) -> Self {
        Self {
            end,
            lookback: Lookback::Days(days),
        }
    }

    /// Earliest date included by a `Days` lookback
    pub fn start_date(&self) -> Option<NaiveDate> {
        match self.lookback {
            Lookback::Days(days) => self.end.checked_sub_days(Days::new(days.max(0) as u64)),
            Lookback::Bars(_) => None,
        }
    }

    /// Apply the window to an ascending, de-duplicated bar slice
    pub fn select(&self, bars: &[Bar]) -> Vec<Bar> {
        let upto: Vec<&Bar> = bars.iter().filter(|b| b.date() <= self.end).collect();
        match self.lookback {
            Lookback::Bars(n) => {
                let skip = upto.len().saturating_sub(n);
                upto.into_iter().skip(skip).cloned().collect()
            }
            Lookback::Days(_) => {
                let start = self.start_date().unwrap_or(NaiveDate::MIN);
                upto.into_iter()
                    .filter(|b| b.date() >= start)
                    .cloned()
                    .collect()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub code: String,
    pub name: String,
}

impl Instrument {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Ordered bars (oldest first) for one instrument at one granularity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSeries {
    pub code: String,
    pub granularity: Granularity,
    pub bars: Vec<Bar>,
}

impl InstrumentSeries {
    /// Builds a series, sorting by timestamp and dropping duplicate timestamps
    /// (the last write for a timestamp wins, so an amended intraday bar replaces
    /// the earlier one).
    pub fn new(code: impl Into<String>, granularity: Granularity, mut bars: Vec<Bar>) -> Self {
        bars.reverse();
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Self {
            code: code.into(),
            granularity,
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}
