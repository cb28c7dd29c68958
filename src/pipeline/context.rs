//! Dependency context shared by the screening stages

use crate::cache::CacheGateway;
use crate::config::ScreenerConfig;
use crate::db::ScreenerStore;
use crate::metrics::Metrics;
use crate::models::Stage;
use crate::services::market_data::{SeriesProvider, UniverseProvider};
use std::sync::Arc;
use std::time::Duration;

/// Handles injected into every stage at construction.
///
/// Stages never look collaborators up from ambient state; replays and tests
/// build a context over in-memory implementations.
#[derive(Clone)]
pub struct StageContext {
    pub series: Arc<dyn SeriesProvider>,
    pub universe: Arc<dyn UniverseProvider>,
    pub store: Arc<dyn ScreenerStore>,
    pub cache: Arc<dyn CacheGateway>,
    pub metrics: Option<Arc<Metrics>>,
    pub config: Arc<ScreenerConfig>,
}

impl StageContext {
    pub fn new(
        series: Arc<dyn SeriesProvider>,
        universe: Arc<dyn UniverseProvider>,
        store: Arc<dyn ScreenerStore>,
        cache: Arc<dyn CacheGateway>,
        config: ScreenerConfig,
    ) -> Self {
        Self {
            series,
            universe,
            store,
            cache,
            metrics: None,
            config: Arc::new(config),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub(crate) fn record_cache_hit(&self, stage: Stage) {
        if let Some(metrics) = &self.metrics {
            metrics.cache_hits_total.with_label_values(&[stage.as_str()]).inc();
        }
    }

    pub(crate) fn record_run(
        &self,
        stage: Stage,
        evaluated: usize,
        passed: usize,
        failed: usize,
        elapsed: Duration,
    ) {
        if let Some(metrics) = &self.metrics {
            let label = [stage.as_str()];
            metrics.stage_runs_total.with_label_values(&label).inc();
            metrics
                .instruments_evaluated_total
                .with_label_values(&label)
                .inc_by(evaluated as u64);
            metrics
                .instruments_passed_total
                .with_label_values(&label)
                .inc_by(passed as u64);
            metrics
                .instrument_failures_total
                .with_label_values(&label)
                .inc_by(failed as u64);
            metrics
                .stage_duration_seconds
                .with_label_values(&label)
                .observe(elapsed.as_secs_f64());
        }
    }
}
