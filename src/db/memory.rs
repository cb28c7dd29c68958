//! In-memory store with the same atomicity contract as Postgres

use super::ScreenerStore;
use crate::error::{Result, ScreenerError};
use crate::models::{
    NewTradeSignal, PoolCandidate, ScanCandidate, SignalStatus, SignalType, TradeSignal,
};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct State {
    scans: BTreeMap<NaiveDate, Vec<ScanCandidate>>,
    pools: BTreeMap<NaiveDate, Vec<PoolCandidate>>,
    signals: Vec<TradeSignal>,
    next_signal_id: i64,
}

/// Each replace swaps the date's rows under one write lock, so readers see
/// either the old or the new complete set.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn signal_count(&self) -> usize {
        self.state.read().await.signals.len()
    }
}

fn newest_first(mut signals: Vec<TradeSignal>) -> Vec<TradeSignal> {
    signals.sort_by(|a, b| b.signal_date.cmp(&a.signal_date).then(b.id.cmp(&a.id)));
    signals
}

#[async_trait]
impl ScreenerStore for MemoryStore {
    async fn replace_scan_candidates(&self, date: NaiveDate, rows: &[ScanCandidate]) -> Result<()> {
        let mut state = self.state.write().await;
        state.scans.insert(date, rows.to_vec());
        Ok(())
    }

    async fn scan_candidates(&self, date: NaiveDate) -> Result<Vec<ScanCandidate>> {
        let state = self.state.read().await;
        let mut rows = state.scans.get(&date).cloned().unwrap_or_default();
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(rows)
    }

    async fn latest_scan_date(&self, on_or_before: NaiveDate) -> Result<Option<NaiveDate>> {
        let state = self.state.read().await;
        Ok(state
            .scans
            .range(..=on_or_before)
            .rev()
            .find(|(_, rows)| !rows.is_empty())
            .map(|(date, _)| *date))
    }

    async fn scan_history(&self, limit: usize) -> Result<Vec<(NaiveDate, usize)>> {
        let state = self.state.read().await;
        Ok(state
            .scans
            .iter()
            .rev()
            .filter(|(_, rows)| !rows.is_empty())
            .take(limit)
            .map(|(date, rows)| (*date, rows.len()))
            .collect())
    }

    async fn replace_pool_candidates(&self, date: NaiveDate, rows: &[PoolCandidate]) -> Result<()> {
        let mut state = self.state.write().await;
        state.pools.insert(date, rows.to_vec());
        Ok(())
    }

    async fn pool_candidates(&self, date: NaiveDate) -> Result<Vec<PoolCandidate>> {
        let state = self.state.read().await;
        let mut rows = state.pools.get(&date).cloned().unwrap_or_default();
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(rows)
    }

    async fn signal_exists(
        &self,
        code: &str,
        date: NaiveDate,
        signal_type: SignalType,
    ) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .signals
            .iter()
            .any(|s| s.code == code && s.signal_date == date && s.signal_type == signal_type))
    }

    async fn insert_signals(&self, signals: &[NewTradeSignal]) -> Result<Vec<TradeSignal>> {
        for signal in signals {
            signal.validate().map_err(ScreenerError::Persistence)?;
        }

        let mut state = self.state.write().await;
        let created_at = Local::now().naive_local();
        let mut inserted: Vec<TradeSignal> = Vec::new();

        for signal in signals {
            let duplicate = state.signals.iter().chain(inserted.iter()).any(|s| {
                s.code == signal.code
                    && s.signal_date == signal.signal_date
                    && s.signal_type == signal.signal_type
            });
            if duplicate {
                continue;
            }

            let id = state.next_signal_id + inserted.len() as i64 + 1;
            inserted.push(TradeSignal::from_new(id, signal.clone(), created_at));
        }

        state.next_signal_id += inserted.len() as i64;
        state.signals.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn update_signal_status(
        &self,
        id: i64,
        status: SignalStatus,
        note: Option<&str>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(signal) = state.signals.iter_mut().find(|s| s.id == id) else {
            return Ok(false);
        };

        signal.status = status;
        if let Some(note) = note.filter(|n| !n.is_empty()) {
            signal.rationale = TradeSignal::append_note(&signal.rationale, note);
        }
        Ok(true)
    }

    async fn get_signal(&self, id: i64) -> Result<Option<TradeSignal>> {
        let state = self.state.read().await;
        Ok(state.signals.iter().find(|s| s.id == id).cloned())
    }

    async fn signals(
        &self,
        date: NaiveDate,
        status: Option<SignalStatus>,
    ) -> Result<Vec<TradeSignal>> {
        let state = self.state.read().await;
        let rows = state
            .signals
            .iter()
            .filter(|s| s.signal_date == date && status.is_none_or(|st| s.status == st))
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn signal_history(&self, since: NaiveDate) -> Result<Vec<TradeSignal>> {
        let state = self.state.read().await;
        let rows = state
            .signals
            .iter()
            .filter(|s| s.signal_date >= since)
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }

    async fn signals_for_code(&self, code: &str) -> Result<Vec<TradeSignal>> {
        let state = self.state.read().await;
        let rows = state
            .signals
            .iter()
            .filter(|s| s.code == code)
            .cloned()
            .collect();
        Ok(newest_first(rows))
    }
}
