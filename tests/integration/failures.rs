//! Stage-level persistence failures: the error surfaces and nothing partial lands

use crate::test_utils::{
    crossing_volumes, daily_bars, pool_entry, scan_date, seeded_market, today, TestPipeline,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use limitflag::cache::{snapshot_key, MemoryCache};
use limitflag::config::ScreenerConfig;
use limitflag::db::{MemoryStore, ScreenerStore};
use limitflag::error::{Result, ScreenerError};
use limitflag::models::{
    Granularity, NewTradeSignal, PoolCandidate, ScanCandidate, SignalStatus, SignalType, Stage,
    TradeSignal,
};
use limitflag::pipeline::{PatternRecognizer, PoolFilter, StageContext, UniverseScanner};
use limitflag::services::InMemoryMarketData;
use std::sync::Arc;

#[derive(Clone, Copy, PartialEq)]
enum Failure {
    ScanReplace,
    PoolReplace,
    /// The second row of a signal batch is unwritable
    SecondSignal,
}

/// MemoryStore with one write path broken
struct FailingStore {
    inner: MemoryStore,
    failure: Failure,
}

impl FailingStore {
    fn new(failure: Failure) -> Self {
        Self {
            inner: MemoryStore::new(),
            failure,
        }
    }
}

#[async_trait]
impl ScreenerStore for FailingStore {
    async fn replace_scan_candidates(&self, date: NaiveDate, rows: &[ScanCandidate]) -> Result<()> {
        if self.failure == Failure::ScanReplace {
            return Err(ScreenerError::Persistence("disk full".to_string()));
        }
        self.inner.replace_scan_candidates(date, rows).await
    }

    async fn scan_candidates(&self, date: NaiveDate) -> Result<Vec<ScanCandidate>> {
        self.inner.scan_candidates(date).await
    }

    async fn latest_scan_date(&self, on_or_before: NaiveDate) -> Result<Option<NaiveDate>> {
        self.inner.latest_scan_date(on_or_before).await
    }

    async fn scan_history(&self, limit: usize) -> Result<Vec<(NaiveDate, usize)>> {
        self.inner.scan_history(limit).await
    }

    async fn replace_pool_candidates(&self, date: NaiveDate, rows: &[PoolCandidate]) -> Result<()> {
        if self.failure == Failure::PoolReplace {
            return Err(ScreenerError::Persistence("disk full".to_string()));
        }
        self.inner.replace_pool_candidates(date, rows).await
    }

    async fn pool_candidates(&self, date: NaiveDate) -> Result<Vec<PoolCandidate>> {
        self.inner.pool_candidates(date).await
    }

    async fn signal_exists(
        &self,
        code: &str,
        date: NaiveDate,
        signal_type: SignalType,
    ) -> Result<bool> {
        self.inner.signal_exists(code, date, signal_type).await
    }

    async fn insert_signals(&self, signals: &[NewTradeSignal]) -> Result<Vec<TradeSignal>> {
        let mut rows = signals.to_vec();
        if self.failure == Failure::SecondSignal {
            if let Some(second) = rows.get_mut(1) {
                second.signal_price = f64::NAN;
            }
        }
        self.inner.insert_signals(&rows).await
    }

    async fn update_signal_status(
        &self,
        id: i64,
        status: SignalStatus,
        note: Option<&str>,
    ) -> Result<bool> {
        self.inner.update_signal_status(id, status, note).await
    }

    async fn get_signal(&self, id: i64) -> Result<Option<TradeSignal>> {
        self.inner.get_signal(id).await
    }

    async fn signals(
        &self,
        date: NaiveDate,
        status: Option<SignalStatus>,
    ) -> Result<Vec<TradeSignal>> {
        self.inner.signals(date, status).await
    }

    async fn signal_history(&self, since: NaiveDate) -> Result<Vec<TradeSignal>> {
        self.inner.signal_history(since).await
    }

    async fn signals_for_code(&self, code: &str) -> Result<Vec<TradeSignal>> {
        self.inner.signals_for_code(code).await
    }
}

fn failing_context(
    market: Arc<InMemoryMarketData>,
    failure: Failure,
) -> (StageContext, Arc<FailingStore>, Arc<MemoryCache>) {
    let store = Arc::new(FailingStore::new(failure));
    let cache = Arc::new(MemoryCache::new());
    let context = StageContext::new(
        market.clone(),
        market,
        store.clone(),
        cache.clone(),
        ScreenerConfig::default(),
    );
    (context, store, cache)
}

#[tokio::test]
async fn universe_scan_write_failure_aborts_the_stage() {
    let (context, store, cache) = failing_context(seeded_market(), Failure::ScanReplace);

    let result = UniverseScanner::new(context).run(scan_date()).await;

    assert!(matches!(result, Err(ScreenerError::Persistence(_))));
    assert!(store.scan_candidates(scan_date()).await.unwrap().is_empty());
    assert!(!cache.contains(&snapshot_key(Stage::UniverseScan, scan_date())));
}

#[tokio::test]
async fn pool_filter_write_failure_aborts_the_stage() {
    let universe = TestPipeline::new()
        .pipeline
        .run_universe_scan(scan_date())
        .await
        .unwrap()
        .candidates;
    assert!(!universe.is_empty());

    let (context, store, cache) = failing_context(seeded_market(), Failure::PoolReplace);
    let result = PoolFilter::new(context).run(today(), universe).await;

    assert!(matches!(result, Err(ScreenerError::Persistence(_))));
    assert!(store.pool_candidates(today()).await.unwrap().is_empty());
    assert!(!cache.contains(&snapshot_key(Stage::PoolFilter, today())));
}

#[tokio::test]
async fn rejected_signal_rolls_back_the_whole_batch() {
    let market = seeded_market();
    market.add_instrument("AAB", "Alpha Bis");
    market.insert_series("AAB", Granularity::Daily, daily_bars(&crossing_volumes(), true));

    let (context, store, _cache) = failing_context(market, Failure::SecondSignal);
    let result = PatternRecognizer::new(context)
        .run(
            today(),
            vec![pool_entry("AAA", "Alpha"), pool_entry("AAB", "Alpha Bis")],
        )
        .await;

    assert!(matches!(result, Err(ScreenerError::Persistence(_))));
    assert_eq!(store.inner.signal_count().await, 0);
    assert!(!store
        .signal_exists("AAA", today(), SignalType::Buy)
        .await
        .unwrap());
}
