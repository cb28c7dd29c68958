//! Screening stages and the orchestrator that chains them.
//!
//! Data flows strictly downstream: universe scan -> pool filter -> pattern
//! recognition. Each stage commits its dated snapshot before the next one
//! reads it, so any stage can be replayed for a past date.

pub mod context;
pub mod fanout;
pub mod lifecycle;
pub mod pattern;
pub mod pool;
pub mod universe;

pub use context::StageContext;
pub use lifecycle::SignalLifecycle;
pub use pattern::{PatternRecognizer, PatternReport};
pub use pool::{PoolFilter, PoolFilterReport, VolumeCross};
pub use universe::{UniverseScanReport, UniverseScanner};

use crate::cache::{get_json, snapshot_key};
use crate::error::{Result, ScreenerError};
use crate::models::{
    PoolCandidate, ScanCandidate, SignalStatus, SignalType, Stage, TradeSignal,
};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Outcome of the weekday run: pool filter then pattern recognition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRunReport {
    pub as_of: NaiveDate,
    /// Universe snapshot the pool filter consumed, if any
    pub universe_date: Option<NaiveDate>,
    pub pool: Option<PoolFilterReport>,
    pub pattern: Option<PatternReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStat {
    pub signal_type: SignalType,
    pub status: SignalStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSummary {
    pub code: String,
    pub stats: Vec<SignalStat>,
    pub latest: Option<TradeSignal>,
}

#[derive(Clone)]
pub struct ScreeningPipeline {
    ctx: StageContext,
    universe: UniverseScanner,
    pool: PoolFilter,
    pattern: PatternRecognizer,
    lifecycle: SignalLifecycle,
}

impl ScreeningPipeline {
    pub fn new(ctx: StageContext) -> Self {
        Self {
            universe: UniverseScanner::new(ctx.clone()),
            pool: PoolFilter::new(ctx.clone()),
            pattern: PatternRecognizer::new(ctx.clone()),
            lifecycle: SignalLifecycle::new(ctx.store.clone()),
            ctx,
        }
    }

    pub fn context(&self) -> &StageContext {
        &self.ctx
    }

    pub fn lifecycle(&self) -> &SignalLifecycle {
        &self.lifecycle
    }

    pub async fn run_universe_scan(&self, as_of: NaiveDate) -> Result<UniverseScanReport> {
        self.universe.run(as_of).await
    }

    /// Pool filter over the most recent universe snapshot on or before `as_of`,
    /// then pattern recognition over its survivors.
    pub async fn run_daily(&self, as_of: NaiveDate) -> Result<DailyRunReport> {
        let Some(universe_date) = self.ctx.store.latest_scan_date(as_of).await? else {
            warn!(as_of = %as_of, "No universe scan results found for daily run");
            return Ok(DailyRunReport {
                as_of,
                universe_date: None,
                pool: None,
                pattern: None,
            });
        };

        let universe = self.universe_snapshot(universe_date).await?;
        if universe.is_empty() {
            warn!(as_of = %as_of, universe_date = %universe_date, "Universe snapshot is empty");
        }

        let pool = self.pool.run(as_of, universe).await?;
        let pattern = self.pattern.run(as_of, pool.candidates.clone()).await?;

        info!(
            as_of = %as_of,
            universe_date = %universe_date,
            pool = pool.passed,
            signals = pattern.emitted,
            "Daily run completed"
        );

        Ok(DailyRunReport {
            as_of,
            universe_date: Some(universe_date),
            pool: Some(pool),
            pattern: Some(pattern),
        })
    }

    /// Universe snapshot for one date, cache first then the store
    pub async fn universe_snapshot(&self, date: NaiveDate) -> Result<Vec<ScanCandidate>> {
        let key = snapshot_key(Stage::UniverseScan, date);
        if let Some(cached) = get_json::<Vec<ScanCandidate>>(self.ctx.cache.as_ref(), &key).await {
            return Ok(cached);
        }
        self.ctx.store.scan_candidates(date).await
    }

    pub async fn pool_snapshot(&self, date: NaiveDate) -> Result<Vec<PoolCandidate>> {
        let key = snapshot_key(Stage::PoolFilter, date);
        if let Some(cached) = get_json::<Vec<PoolCandidate>>(self.ctx.cache.as_ref(), &key).await {
            return Ok(cached);
        }
        self.ctx.store.pool_candidates(date).await
    }

    /// Latest universe snapshot on or before `as_of` with its date
    pub async fn latest_universe(
        &self,
        as_of: NaiveDate,
    ) -> Result<Option<(NaiveDate, Vec<ScanCandidate>)>> {
        match self.ctx.store.latest_scan_date(as_of).await? {
            Some(date) => Ok(Some((date, self.universe_snapshot(date).await?))),
            None => Ok(None),
        }
    }

    pub async fn latest_pool(&self, as_of: NaiveDate) -> Result<Vec<PoolCandidate>> {
        self.pool_snapshot(as_of).await
    }

    /// True on the configured weekday when no snapshot exists yet for `date`
    pub async fn should_run_universe_scan(&self, date: NaiveDate) -> Result<bool> {
        if date.weekday() != self.ctx.config.schedule.universe_scan_weekday {
            return Ok(false);
        }
        Ok(self.ctx.store.scan_candidates(date).await?.is_empty())
    }

    /// True on trading days after the configured time when no pool exists yet
    pub async fn should_run_daily(&self, now: NaiveDateTime) -> Result<bool> {
        let today = now.date();
        if !is_trading_day(today) || now.time() < self.ctx.config.schedule.daily_run_after {
            return Ok(false);
        }
        Ok(self.ctx.store.pool_candidates(today).await?.is_empty())
    }

    pub async fn signals_for_day(
        &self,
        date: NaiveDate,
        status: Option<SignalStatus>,
    ) -> Result<Vec<TradeSignal>> {
        self.ctx.store.signals(date, status).await
    }

    pub async fn signal_detail(&self, id: i64) -> Result<TradeSignal> {
        self.ctx
            .store
            .get_signal(id)
            .await?
            .ok_or(ScreenerError::NotFound { id })
    }

    /// Signals dated within the last `days` calendar days of `as_of`
    pub async fn signal_history(&self, as_of: NaiveDate, days: u64) -> Result<Vec<TradeSignal>> {
        let since = as_of.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        self.ctx.store.signal_history(since).await
    }

    pub async fn signal_summary(&self, code: &str) -> Result<SignalSummary> {
        let signals = self.ctx.store.signals_for_code(code).await?;

        let mut counts: BTreeMap<(&'static str, &'static str), SignalStat> = BTreeMap::new();
        for signal in &signals {
            counts
                .entry((signal.signal_type.as_str(), signal.status.as_str()))
                .or_insert(SignalStat {
                    signal_type: signal.signal_type,
                    status: signal.status,
                    count: 0,
                })
                .count += 1;
        }

        Ok(SignalSummary {
            code: code.to_string(),
            stats: counts.into_values().collect(),
            latest: signals.into_iter().next(),
        })
    }

    /// `(date, candidate count)` of past universe scans, newest first
    pub async fn scan_history(&self, limit: usize) -> Result<Vec<(NaiveDate, usize)>> {
        self.ctx.store.scan_history(limit).await
    }
}

/// Monday to Friday. Exchange holidays are not modelled.
pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
