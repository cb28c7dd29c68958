//! Weekly trend + volume scan over the whole instrument universe

use super::context::StageContext;
use super::fanout::fan_out;
use crate::cache::{cache_key, get_json, set_json, snapshot_key};
use crate::config::UniverseScanConfig;
use crate::error::{Result, ScreenerError};
use crate::indicators::moving_average;
use crate::models::{Granularity, Instrument, InstrumentSeries, ScanCandidate, SeriesRange, Stage};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseScanReport {
    pub as_of: NaiveDate,
    pub total: usize,
    pub passed: usize,
    pub insufficient: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub candidates: Vec<ScanCandidate>,
}

#[derive(Clone)]
pub struct UniverseScanner {
    ctx: StageContext,
}

impl UniverseScanner {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    /// Scan every listed instrument and replace the snapshot for `as_of`.
    pub async fn run(&self, as_of: NaiveDate) -> Result<UniverseScanReport> {
        let started = Instant::now();
        let instruments = self.ctx.universe.list_instruments().await?;
        info!(stage = %Stage::UniverseScan, as_of = %as_of, instruments = instruments.len(), "Starting universe scan");

        let outcome = fan_out(
            Stage::UniverseScan,
            instruments,
            self.ctx.config.concurrency,
            |instrument| {
                let scanner = self.clone();
                async move { scanner.evaluate(&instrument, as_of).await }
            },
        )
        .await;

        let mut candidates = outcome.passed;
        candidates.sort_by(|a, b| a.code.cmp(&b.code));

        self.ctx.store.replace_scan_candidates(as_of, &candidates).await?;
        set_json(
            self.ctx.cache.as_ref(),
            &snapshot_key(Stage::UniverseScan, as_of),
            &candidates,
            self.ctx.config.snapshot_ttl_secs,
        )
        .await;

        let elapsed = started.elapsed();
        self.ctx.record_run(
            Stage::UniverseScan,
            outcome.evaluated,
            candidates.len(),
            outcome.failed,
            elapsed,
        );

        info!(
            stage = %Stage::UniverseScan,
            as_of = %as_of,
            total = outcome.evaluated,
            passed = candidates.len(),
            insufficient = outcome.insufficient,
            failed = outcome.failed,
            duration_ms = elapsed.as_millis() as u64,
            "Universe scan completed"
        );

        Ok(UniverseScanReport {
            as_of,
            total: outcome.evaluated,
            passed: candidates.len(),
            insufficient: outcome.insufficient,
            failed: outcome.failed,
            duration_ms: elapsed.as_millis() as u64,
            candidates,
        })
    }

    /// Verdict for one instrument. `None` means it does not pass.
    ///
    /// Computed verdicts (pass or not) are cached for the day; errors are not.
    pub async fn evaluate(
        &self,
        instrument: &Instrument,
        as_of: NaiveDate,
    ) -> Result<Option<ScanCandidate>> {
        let config = &self.ctx.config.universe;
        let key = cache_key(Stage::UniverseScan, &instrument.code, as_of);

        if let Some(cached) = get_json::<Option<ScanCandidate>>(self.ctx.cache.as_ref(), &key).await {
            debug!(code = %instrument.code, "Universe verdict served from cache");
            self.ctx.record_cache_hit(Stage::UniverseScan);
            return Ok(cached);
        }

        let series = self
            .ctx
            .series
            .fetch_series(
                &instrument.code,
                Granularity::Weekly,
                SeriesRange::last_bars(as_of, config.weekly_history_bars),
            )
            .await?;

        let verdict = evaluate_weekly(instrument, as_of, &series, config)?;
        set_json(self.ctx.cache.as_ref(), &key, &verdict, config.cache_ttl_secs).await;

        Ok(verdict)
    }
}

/// Pass iff the latest close is above the long MA and the latest volume is
/// above the volume MA. Fewer bars than the long period is `DataUnavailable`.
pub fn evaluate_weekly(
    instrument: &Instrument,
    as_of: NaiveDate,
    series: &InstrumentSeries,
    config: &UniverseScanConfig,
) -> Result<Option<ScanCandidate>> {
    if series.len() < config.long_ma_period {
        return Err(ScreenerError::data_unavailable(
            &instrument.code,
            format!(
                "{} weekly bars, need {}",
                series.len(),
                config.long_ma_period
            ),
        ));
    }

    let Some(latest) = series.latest() else {
        return Err(ScreenerError::data_unavailable(&instrument.code, "empty weekly series"));
    };

    let long_ma = moving_average(&series.closes(), config.long_ma_period);
    let vol_ma = moving_average(&series.volumes(), config.vol_ma_period);
    let (Some(&long_ma), Some(&vol_ma)) = (long_ma.last(), vol_ma.last()) else {
        return Ok(None);
    };

    if latest.close > long_ma && latest.volume > vol_ma {
        Ok(Some(ScanCandidate {
            code: instrument.code.clone(),
            name: instrument.name.clone(),
            as_of_date: as_of,
            close_price: latest.close,
            long_ma,
            volume: latest.volume,
            vol_ma,
        }))
    } else {
        Ok(None)
    }
}
