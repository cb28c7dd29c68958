//! Manual status transitions over persisted trade signals

use crate::db::ScreenerStore;
use crate::error::{Result, ScreenerError};
use crate::models::{SignalStatus, TradeSignal};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct SignalLifecycle {
    store: Arc<dyn ScreenerStore>,
}

impl SignalLifecycle {
    pub fn new(store: Arc<dyn ScreenerStore>) -> Self {
        Self { store }
    }

    /// Set `status` and append `note` to the rationale. Unknown ids are `NotFound`.
    pub async fn transition(
        &self,
        id: i64,
        status: SignalStatus,
        note: Option<&str>,
    ) -> Result<TradeSignal> {
        if !self.store.update_signal_status(id, status, note).await? {
            return Err(ScreenerError::NotFound { id });
        }

        let signal = self
            .store
            .get_signal(id)
            .await?
            .ok_or(ScreenerError::NotFound { id })?;

        info!(id = id, code = %signal.code, status = %status, "Signal status updated");
        Ok(signal)
    }

    pub async fn confirm(&self, id: i64, note: Option<&str>) -> Result<TradeSignal> {
        self.transition(id, SignalStatus::Confirmed, note).await
    }

    pub async fn invalidate(&self, id: i64, reason: &str) -> Result<TradeSignal> {
        self.transition(id, SignalStatus::Invalid, Some(reason)).await
    }
}
