use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Buy => "BUY",
            SignalType::Sell => "SELL",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(SignalType::Buy),
            "SELL" => Ok(SignalType::Sell),
            other => Err(format!("unknown signal type '{}'", other)),
        }
    }
}

/// PENDING at creation; CONFIRMED and INVALID are terminal in practice but
/// transitions between any two states are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalStatus {
    Pending,
    Confirmed,
    Invalid,
}

impl SignalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalStatus::Pending => "PENDING",
            SignalStatus::Confirmed => "CONFIRMED",
            SignalStatus::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SignalStatus::Pending),
            "CONFIRMED" => Ok(SignalStatus::Confirmed),
            "INVALID" => Ok(SignalStatus::Invalid),
            other => Err(format!("unknown signal status '{}'", other)),
        }
    }
}

/// Signal fields computed by the pattern recognizer, before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTradeSignal {
    pub code: String,
    pub name: String,
    pub signal_type: SignalType,
    pub signal_date: NaiveDate,
    pub signal_price: f64,
    pub limit_event_date: NaiveDate,
    pub pullback_days: i64,
    pub volume_ratio: f64,
    pub price_change_pct: f64,
    pub upper_shadow_pct: f64,
    pub stop_loss_price: f64,
    pub stop_loss_reason: String,
    pub rationale: String,
}

impl NewTradeSignal {
    /// Reject rows no store should accept: blank code or non-positive prices.
    pub fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("signal has an empty instrument code".to_string());
        }
        for (field, value) in [
            ("signal_price", self.signal_price),
            ("stop_loss_price", self.stop_loss_price),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("signal {} has invalid {} {}", self.code, field, value));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub signal_type: SignalType,
    pub signal_date: NaiveDate,
    pub signal_price: f64,
    pub limit_event_date: NaiveDate,
    pub pullback_days: i64,
    pub volume_ratio: f64,
    pub price_change_pct: f64,
    pub upper_shadow_pct: f64,
    pub stop_loss_price: f64,
    pub stop_loss_reason: String,
    pub status: SignalStatus,
    pub rationale: String,
    pub created_at: NaiveDateTime,
}

impl TradeSignal {
    pub fn from_new(id: i64, new: NewTradeSignal, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            code: new.code,
            name: new.name,
            signal_type: new.signal_type,
            signal_date: new.signal_date,
            signal_price: new.signal_price,
            limit_event_date: new.limit_event_date,
            pullback_days: new.pullback_days,
            volume_ratio: new.volume_ratio,
            price_change_pct: new.price_change_pct,
            upper_shadow_pct: new.upper_shadow_pct,
            stop_loss_price: new.stop_loss_price,
            stop_loss_reason: new.stop_loss_reason,
            status: SignalStatus::Pending,
            rationale: new.rationale,
            created_at,
        }
    }

    /// Rationale after appending a lifecycle note. Never overwrites.
    pub fn append_note(rationale: &str, note: &str) -> String {
        format!("{}\nUpdate: {}", rationale, note)
    }
}
