//! Date-partitioned persistence for stage snapshots and trade signals

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::error::Result;
use crate::models::{
    NewTradeSignal, PoolCandidate, ScanCandidate, SignalStatus, SignalType, TradeSignal,
};
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
pub trait ScreenerStore: Send + Sync {
    /// Atomically swap the universe snapshot for `date` (delete + insert in one unit).
    async fn replace_scan_candidates(&self, date: NaiveDate, rows: &[ScanCandidate]) -> Result<()>;

    async fn scan_candidates(&self, date: NaiveDate) -> Result<Vec<ScanCandidate>>;

    /// Most recent universe snapshot date on or before `date`
    async fn latest_scan_date(&self, on_or_before: NaiveDate) -> Result<Option<NaiveDate>>;

    /// `(date, row count)` pairs, newest first
    async fn scan_history(&self, limit: usize) -> Result<Vec<(NaiveDate, usize)>>;

    /// Atomically swap the pool snapshot for `date`
    async fn replace_pool_candidates(&self, date: NaiveDate, rows: &[PoolCandidate]) -> Result<()>;

    async fn pool_candidates(&self, date: NaiveDate) -> Result<Vec<PoolCandidate>>;

    async fn signal_exists(
        &self,
        code: &str,
        date: NaiveDate,
        signal_type: SignalType,
    ) -> Result<bool>;

    /// Insert PENDING signals as one unit: either every new row lands or none
    /// does. Rows whose (code, date, type) already exists are skipped, so the
    /// result holds only the rows actually inserted.
    async fn insert_signals(&self, signals: &[NewTradeSignal]) -> Result<Vec<TradeSignal>>;

    /// Single-row `insert_signals`. `None` when the signal already exists.
    async fn insert_signal(&self, signal: NewTradeSignal) -> Result<Option<TradeSignal>> {
        let inserted = self.insert_signals(std::slice::from_ref(&signal)).await?;
        Ok(inserted.into_iter().next())
    }

    /// Set status and append `note` to the rationale. `false` when the id is unknown.
    async fn update_signal_status(
        &self,
        id: i64,
        status: SignalStatus,
        note: Option<&str>,
    ) -> Result<bool>;

    async fn get_signal(&self, id: i64) -> Result<Option<TradeSignal>>;

    /// Signals for one date, newest id first
    async fn signals(
        &self,
        date: NaiveDate,
        status: Option<SignalStatus>,
    ) -> Result<Vec<TradeSignal>>;

    /// Signals dated on or after `since`, newest first
    async fn signal_history(&self, since: NaiveDate) -> Result<Vec<TradeSignal>>;

    async fn signals_for_code(&self, code: &str) -> Result<Vec<TradeSignal>>;
}
