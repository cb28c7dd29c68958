//! Prometheus metrics for the screening stages

use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub stage_runs_total: IntCounterVec,
    pub instruments_evaluated_total: IntCounterVec,
    pub instruments_passed_total: IntCounterVec,
    pub instrument_failures_total: IntCounterVec,
    pub cache_hits_total: IntCounterVec,
    pub signals_emitted_total: IntCounter,
    pub stage_duration_seconds: HistogramVec,
    pub database_connected: Gauge,
    pub cache_connected: Gauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let stage_runs_total = IntCounterVec::new(
            Opts::new("stage_runs_total", "Completed stage runs"),
            &["stage"],
        )?;
        let instruments_evaluated_total = IntCounterVec::new(
            Opts::new("instruments_evaluated_total", "Instruments evaluated per stage"),
            &["stage"],
        )?;
        let instruments_passed_total = IntCounterVec::new(
            Opts::new("instruments_passed_total", "Instruments passing a stage"),
            &["stage"],
        )?;
        let instrument_failures_total = IntCounterVec::new(
            Opts::new(
                "instrument_failures_total",
                "Per-instrument failures converted to rejections",
            ),
            &["stage"],
        )?;
        let cache_hits_total = IntCounterVec::new(
            Opts::new("cache_hits_total", "Per-instrument cache hits"),
            &["stage"],
        )?;
        let signals_emitted_total =
            IntCounter::new("signals_emitted_total", "Trade signals inserted")?;
        let stage_duration_seconds = HistogramVec::new(
            HistogramOpts::new("stage_duration_seconds", "Wall time of a stage run")
                .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0, 900.0]),
            &["stage"],
        )?;
        let database_connected = Gauge::new("database_connected", "1 when the store is reachable")?;
        let cache_connected = Gauge::new("cache_connected", "1 when Redis is reachable")?;

        registry.register(Box::new(stage_runs_total.clone()))?;
        registry.register(Box::new(instruments_evaluated_total.clone()))?;
        registry.register(Box::new(instruments_passed_total.clone()))?;
        registry.register(Box::new(instrument_failures_total.clone()))?;
        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(signals_emitted_total.clone()))?;
        registry.register(Box::new(stage_duration_seconds.clone()))?;
        registry.register(Box::new(database_connected.clone()))?;
        registry.register(Box::new(cache_connected.clone()))?;

        Ok(Self {
            registry,
            stage_runs_total,
            instruments_evaluated_total,
            instruments_passed_total,
            instrument_failures_total,
            cache_hits_total,
            signals_emitted_total,
            stage_duration_seconds,
            database_connected,
            cache_connected,
        })
    }

    /// Render every registered metric in the text exposition format
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
