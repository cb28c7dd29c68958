//! Market data provider interfaces plus retry and in-memory implementations.

use crate::config::RetryConfig;
use crate::error::{Result, ScreenerError};
use crate::models::{Bar, Granularity, Instrument, InstrumentSeries, SeriesRange};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::warn;

#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Bars sorted ascending with unique timestamps. An empty series is a
    /// valid outcome; callers treat it as insufficient data.
    async fn fetch_series(
        &self,
        code: &str,
        granularity: Granularity,
        range: SeriesRange,
    ) -> Result<InstrumentSeries>;
}

#[async_trait]
pub trait UniverseProvider: Send + Sync {
    async fn list_instruments(&self) -> Result<Vec<Instrument>>;
}

/// Bounds every fetch with a timeout and retries transient failures with
/// exponential backoff.
pub struct RetryingProvider {
    inner: Arc<dyn SeriesProvider>,
    config: RetryConfig,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn SeriesProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.config.base_delay_ms))
            .with_factor(2.0)
            .with_max_times(self.config.max_attempts.saturating_sub(1))
    }

    async fn fetch_once(
        inner: &Arc<dyn SeriesProvider>,
        code: &str,
        granularity: Granularity,
        range: SeriesRange,
        timeout: Duration,
    ) -> Result<InstrumentSeries> {
        match tokio::time::timeout(timeout, inner.fetch_series(code, granularity, range)).await {
            Ok(result) => result,
            Err(_) => Err(ScreenerError::transient(
                code,
                format!("{} fetch timed out after {:?}", granularity, timeout),
            )),
        }
    }
}

#[async_trait]
impl SeriesProvider for RetryingProvider {
    async fn fetch_series(
        &self,
        code: &str,
        granularity: Granularity,
        range: SeriesRange,
    ) -> Result<InstrumentSeries> {
        let inner = &self.inner;
        let timeout = Duration::from_secs(self.config.fetch_timeout_secs);

        let fetch = move || async move {
            Self::fetch_once(inner, code, granularity, range, timeout).await
        };

        fetch
            .retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(|e: &ScreenerError| e.is_transient())
            .notify(|e: &ScreenerError, delay: Duration| {
                warn!(
                    code = %code,
                    granularity = %granularity,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Transient fetch failure, retrying"
                );
            })
            .await
    }
}

/// Series and universe held in memory. Backs tests and offline replays.
#[derive(Default)]
pub struct InMemoryMarketData {
    instruments: RwLock<Vec<Instrument>>,
    series: RwLock<HashMap<(String, Granularity), Vec<Bar>>>,
}

impl InMemoryMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instrument(&self, code: &str, name: &str) {
        if let Ok(mut instruments) = self.instruments.write() {
            if !instruments.iter().any(|i| i.code == code) {
                instruments.push(Instrument::new(code, name));
            }
        }
    }

    /// Replace the whole series for an instrument
    pub fn insert_series(&self, code: &str, granularity: Granularity, bars: Vec<Bar>) {
        let normalized = InstrumentSeries::new(code, granularity, bars).bars;
        if let Ok(mut series) = self.series.write() {
            series.insert((code.to_string(), granularity), normalized);
        }
    }

    /// Append a bar, or amend the bar already stored at the same timestamp
    pub fn upsert_bar(&self, code: &str, granularity: Granularity, bar: Bar) {
        if let Ok(mut series) = self.series.write() {
            let bars = series.entry((code.to_string(), granularity)).or_default();
            match bars.iter_mut().find(|b| b.timestamp == bar.timestamp) {
                Some(existing) => *existing = bar,
                None => {
                    bars.push(bar);
                    bars.sort_by_key(|b| b.timestamp);
                }
            }
        }
    }
}

#[async_trait]
impl SeriesProvider for InMemoryMarketData {
    async fn fetch_series(
        &self,
        code: &str,
        granularity: Granularity,
        range: SeriesRange,
    ) -> Result<InstrumentSeries> {
        let series = self
            .series
            .read()
            .map_err(|_| ScreenerError::transient(code, "series lock poisoned"))?;
        let bars = series
            .get(&(code.to_string(), granularity))
            .map(|bars| range.select(bars))
            .unwrap_or_default();
        Ok(InstrumentSeries::new(code, granularity, bars))
    }
}

#[async_trait]
impl UniverseProvider for InMemoryMarketData {
    async fn list_instruments(&self) -> Result<Vec<Instrument>> {
        self.instruments
            .read()
            .map(|i| i.clone())
            .map_err(|_| ScreenerError::Persistence("instrument lock poisoned".to_string()))
    }
}
