//! Limit-up -> contracting flag -> breakout candle recognition

use super::context::StageContext;
use super::fanout::fan_out;
use crate::config::PatternConfig;
use crate::error::Result;
use crate::indicators::{
    is_sharp_up_move, mean, price_change_ratio, upper_shadow_ratio, volume_ratio,
};
use crate::models::{
    Bar, Granularity, LimitEvent, NewTradeSignal, PoolCandidate, SeriesRange, SignalType, Stage,
    TradeSignal,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

pub const STOP_LOSS_REASON: &str = "limit-up pivot";

/// Breakout candle measurements, percentages already scaled and rounded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakout {
    pub date: NaiveDate,
    pub close: f64,
    pub volume_ratio: f64,
    pub price_change_pct: f64,
    pub upper_shadow_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternReport {
    pub as_of: NaiveDate,
    pub total: usize,
    pub emitted: usize,
    pub duplicates: usize,
    pub insufficient: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub signals: Vec<TradeSignal>,
}

/// No stage cache here: a signal must reflect the latest bar exactly.
#[derive(Clone)]
pub struct PatternRecognizer {
    ctx: StageContext,
}

impl PatternRecognizer {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, as_of: NaiveDate, pool: Vec<PoolCandidate>) -> Result<PatternReport> {
        let started = Instant::now();
        info!(stage = %Stage::PatternRecognition, as_of = %as_of, candidates = pool.len(), "Starting pattern recognition");

        let mut outcome = fan_out(
            Stage::PatternRecognition,
            pool,
            self.ctx.config.concurrency,
            |candidate| {
                let recognizer = self.clone();
                async move { recognizer.evaluate(&candidate, as_of).await }
            },
        )
        .await;
        outcome.passed.sort_by(|a, b| a.code.cmp(&b.code));

        let mut fresh = Vec::with_capacity(outcome.passed.len());
        let mut duplicates = 0;
        for candidate in outcome.passed {
            if self
                .ctx
                .store
                .signal_exists(&candidate.code, candidate.signal_date, candidate.signal_type)
                .await?
            {
                debug!(code = %candidate.code, date = %candidate.signal_date, "Signal already recorded, skipping");
                duplicates += 1;
                continue;
            }
            fresh.push(candidate);
        }

        // One write for the whole run: a failure leaves no partial signal set.
        let signals = self.ctx.store.insert_signals(&fresh).await?;
        duplicates += fresh.len() - signals.len();
        for signal in &signals {
            info!(
                id = signal.id,
                code = %signal.code,
                price = signal.signal_price,
                stop_loss = signal.stop_loss_price,
                "Buy signal emitted"
            );
        }

        if let Some(metrics) = &self.ctx.metrics {
            metrics.signals_emitted_total.inc_by(signals.len() as u64);
        }

        let elapsed = started.elapsed();
        self.ctx.record_run(
            Stage::PatternRecognition,
            outcome.evaluated,
            signals.len(),
            outcome.failed,
            elapsed,
        );

        info!(
            stage = %Stage::PatternRecognition,
            as_of = %as_of,
            total = outcome.evaluated,
            emitted = signals.len(),
            duplicates = duplicates,
            failed = outcome.failed,
            duration_ms = elapsed.as_millis() as u64,
            "Pattern recognition completed"
        );

        Ok(PatternReport {
            as_of,
            total: outcome.evaluated,
            emitted: signals.len(),
            duplicates,
            insufficient: outcome.insufficient,
            failed: outcome.failed,
            duration_ms: elapsed.as_millis() as u64,
            signals,
        })
    }

    pub async fn evaluate(
        &self,
        candidate: &PoolCandidate,
        as_of: NaiveDate,
    ) -> Result<Option<NewTradeSignal>> {
        let config = &self.ctx.config.pattern;
        let series = self
            .ctx
            .series
            .fetch_series(
                &candidate.code,
                Granularity::Daily,
                SeriesRange::last_days(as_of, config.sharp_move_lookback_days),
            )
            .await?;

        Ok(recognize(&candidate.code, &candidate.name, &series.bars, config))
    }
}

/// Full buy-pattern check over ascending daily bars
pub fn recognize(code: &str, name: &str, bars: &[Bar], config: &PatternConfig) -> Option<NewTradeSignal> {
    let event = find_sharp_move(bars, config.sharp_move_threshold)?;
    if !has_contracting_flag(bars, &event, config) {
        return None;
    }
    let breakout = check_breakout(bars, config)?;

    let pullback_days = (breakout.date - event.date).num_days();
    let rationale = describe(pullback_days, &breakout);

    Some(NewTradeSignal {
        code: code.to_string(),
        name: name.to_string(),
        signal_type: SignalType::Buy,
        signal_date: breakout.date,
        signal_price: breakout.close,
        limit_event_date: event.date,
        pullback_days,
        volume_ratio: breakout.volume_ratio,
        price_change_pct: breakout.price_change_pct,
        upper_shadow_pct: breakout.upper_shadow_pct,
        stop_loss_price: round2(event.price * config.stop_loss_ratio),
        stop_loss_reason: STOP_LOSS_REASON.to_string(),
        rationale,
    })
}

/// First bar (oldest to newest) closing at least `threshold` above the previous close
pub fn find_sharp_move(bars: &[Bar], threshold: f64) -> Option<LimitEvent> {
    (1..bars.len())
        .find(|&i| is_sharp_up_move(bars[i].open, bars[i].close, bars[i - 1].close, threshold))
        .map(|i| LimitEvent {
            date: bars[i].date(),
            price: bars[i].close,
            volume: bars[i].volume,
            index: i,
        })
}

/// Second-half mean volume of the post-event window below `ratio` x the first half.
pub fn has_contracting_flag(bars: &[Bar], event: &LimitEvent, config: &PatternConfig) -> bool {
    let after: Vec<f64> = bars
        .iter()
        .skip(event.index + 1)
        .take(config.flag_window_bars)
        .map(|b| b.volume)
        .collect();
    if after.len() < 2 {
        return false;
    }

    let mid = after.len() / 2;
    match (mean(&after[..mid]), mean(&after[mid..])) {
        (Some(first), Some(second)) => second < first * config.flag_contraction_ratio,
        _ => false,
    }
}

/// Latest bar against the one before it
pub fn check_breakout(bars: &[Bar], config: &PatternConfig) -> Option<Breakout> {
    let [.., previous, latest] = bars else {
        return None;
    };

    let vol_ratio = volume_ratio(latest.volume, previous.volume);
    let change = price_change_ratio(latest.close, previous.close);
    let shadow = upper_shadow_ratio(latest.open, latest.high, latest.close);

    let passes = vol_ratio >= config.breakout_volume_ratio
        && change >= config.breakout_change_min
        && change <= config.breakout_change_max
        && shadow < config.upper_shadow_max;
    if !passes {
        return None;
    }

    Some(Breakout {
        date: latest.date(),
        close: latest.close,
        volume_ratio: round2(vol_ratio),
        price_change_pct: round2(change * 100.0),
        upper_shadow_pct: round2(shadow * 100.0),
    })
}

fn describe(pullback_days: i64, breakout: &Breakout) -> String {
    format!(
        "Pulled back {} days after the limit-up bar into a contracting-volume flag; \
         today's volume is {}x the prior bar, closing up {}% with an upper shadow of only {}%. \
         Consider entering near the close or at the next open.",
        pullback_days, breakout.volume_ratio, breakout.price_change_pct, breakout.upper_shadow_pct
    )
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
