//! Daily volume golden cross + 120-minute MACD momentum filter

use super::context::StageContext;
use super::fanout::fan_out;
use crate::cache::{cache_key, get_json, set_json, snapshot_key};
use crate::config::PoolFilterConfig;
use crate::error::{Result, ScreenerError};
use crate::indicators::{
    consecutive_increasing_positive_streak, detect_golden_cross, macd_default, moving_average,
};
use crate::models::{Granularity, PoolCandidate, ScanCandidate, SeriesRange, Stage};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Cached result of the daily volume-average cross check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeCross {
    pub crossed: bool,
    pub short_vol_ma: Option<f64>,
    pub long_vol_ma: Option<f64>,
}

impl VolumeCross {
    fn rejected() -> Self {
        Self {
            crossed: false,
            short_vol_ma: None,
            long_vol_ma: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolFilterReport {
    pub as_of: NaiveDate,
    pub total: usize,
    pub passed: usize,
    pub insufficient: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub candidates: Vec<PoolCandidate>,
}

#[derive(Clone)]
pub struct PoolFilter {
    ctx: StageContext,
}

impl PoolFilter {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    /// Filter the universe survivors and replace the pool snapshot for `as_of`.
    pub async fn run(
        &self,
        as_of: NaiveDate,
        universe: Vec<ScanCandidate>,
    ) -> Result<PoolFilterReport> {
        let started = Instant::now();
        info!(stage = %Stage::PoolFilter, as_of = %as_of, candidates = universe.len(), "Starting pool filter");

        let outcome = fan_out(
            Stage::PoolFilter,
            universe,
            self.ctx.config.concurrency,
            |candidate| {
                let filter = self.clone();
                async move { filter.evaluate(&candidate, as_of).await }
            },
        )
        .await;

        let mut candidates = outcome.passed;
        candidates.sort_by(|a, b| a.code.cmp(&b.code));

        self.ctx.store.replace_pool_candidates(as_of, &candidates).await?;
        set_json(
            self.ctx.cache.as_ref(),
            &snapshot_key(Stage::PoolFilter, as_of),
            &candidates,
            self.ctx.config.snapshot_ttl_secs,
        )
        .await;

        let elapsed = started.elapsed();
        self.ctx.record_run(
            Stage::PoolFilter,
            outcome.evaluated,
            candidates.len(),
            outcome.failed,
            elapsed,
        );

        info!(
            stage = %Stage::PoolFilter,
            as_of = %as_of,
            total = outcome.evaluated,
            passed = candidates.len(),
            insufficient = outcome.insufficient,
            failed = outcome.failed,
            duration_ms = elapsed.as_millis() as u64,
            "Pool filter completed"
        );

        Ok(PoolFilterReport {
            as_of,
            total: outcome.evaluated,
            passed: candidates.len(),
            insufficient: outcome.insufficient,
            failed: outcome.failed,
            duration_ms: elapsed.as_millis() as u64,
            candidates,
        })
    }

    /// Both the volume cross and the momentum streak must hold.
    pub async fn evaluate(
        &self,
        candidate: &ScanCandidate,
        as_of: NaiveDate,
    ) -> Result<Option<PoolCandidate>> {
        let cross = self.volume_golden_cross(&candidate.code, as_of).await?;
        if !cross.crossed {
            return Ok(None);
        }

        let Some(streak) = self.momentum_streak(&candidate.code, as_of).await? else {
            return Ok(None);
        };

        Ok(Some(PoolCandidate {
            code: candidate.code.clone(),
            name: candidate.name.clone(),
            as_of_date: as_of,
            short_vol_ma: cross.short_vol_ma,
            long_vol_ma: cross.long_vol_ma,
            golden_cross: true,
            momentum_status: format!("MACD histogram expanding for {} bars", streak),
        }))
    }

    pub async fn volume_golden_cross(&self, code: &str, as_of: NaiveDate) -> Result<VolumeCross> {
        let config = &self.ctx.config.pool;
        let key = cache_key(Stage::VolumeCross, code, as_of);

        if let Some(cached) = get_json::<VolumeCross>(self.ctx.cache.as_ref(), &key).await {
            debug!(code = %code, crossed = cached.crossed, "Volume cross served from cache");
            self.ctx.record_cache_hit(Stage::VolumeCross);
            return Ok(cached);
        }

        let series = self
            .ctx
            .series
            .fetch_series(
                code,
                Granularity::Daily,
                SeriesRange::last_bars(as_of, config.daily_history_bars),
            )
            .await?;

        let cross = check_volume_cross(&series.volumes(), config);
        set_json(self.ctx.cache.as_ref(), &key, &cross, config.cross_cache_ttl_secs).await;

        Ok(cross)
    }

    /// Streak length of the 120-minute MACD histogram, `None` when below the minimum.
    pub async fn momentum_streak(&self, code: &str, as_of: NaiveDate) -> Result<Option<usize>> {
        let config = &self.ctx.config.pool;
        let series = self
            .ctx
            .series
            .fetch_series(
                code,
                Granularity::Min120,
                SeriesRange::last_days(as_of, config.intraday_lookback_days),
            )
            .await?;

        if series.len() < config.min_intraday_bars {
            return Err(ScreenerError::data_unavailable(
                code,
                format!(
                    "{} intraday bars, need {}",
                    series.len(),
                    config.min_intraday_bars
                ),
            ));
        }

        Ok(momentum_streak(&series.closes(), config))
    }
}

/// Short/long volume MA golden cross within the trailing window.
///
/// A window of N points holds N-1 adjacent pairs, so the crossover lookback
/// is `cross_window_points - 1`. Too few daily bars is a plain rejection.
pub fn check_volume_cross(volumes: &[f64], config: &PoolFilterConfig) -> VolumeCross {
    if volumes.len() < config.min_daily_bars {
        return VolumeCross::rejected();
    }

    let short = moving_average(volumes, config.short_vol_ma);
    let long = moving_average(volumes, config.long_vol_ma);
    let lookback = config.cross_window_points.saturating_sub(1);

    VolumeCross {
        crossed: detect_golden_cross(&short, &long, lookback),
        short_vol_ma: short.last().copied(),
        long_vol_ma: long.last().copied(),
    }
}

pub fn momentum_streak(closes: &[f64], config: &PoolFilterConfig) -> Option<usize> {
    let histogram = macd_default(closes).histogram;
    match consecutive_increasing_positive_streak(&histogram, config.min_streak) {
        0 => None,
        run => Some(run),
    }
}
