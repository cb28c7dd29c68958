//! Limitflag Worker
//!
//! Runs the screening pipeline on its cron schedules and serves /health and
//! /metrics. `worker once <universe|daily> [YYYY-MM-DD]` runs a single stage
//! for a date and exits, which is how past dates are replayed.

use chrono::{Local, NaiveDate};
use dotenvy::dotenv;
use limitflag::cache::{CacheGateway, MemoryCache, RedisCache};
use limitflag::config::{self, ScreenerConfig};
use limitflag::core::http::{start_server, AppState, SERVICE_NAME};
use limitflag::core::scheduler::JobScheduler;
use limitflag::db::PostgresStore;
use limitflag::logging;
use limitflag::metrics::Metrics;
use limitflag::pipeline::{ScreeningPipeline, StageContext};
use limitflag::services::market_data::RetryingProvider;
use std::env;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging(SERVICE_NAME);
    info!("Starting Limitflag Worker");

    let screener_config = ScreenerConfig::from_env();
    let metrics = Arc::new(Metrics::new()?);

    info!("Initializing Postgres connection...");
    let store = match PostgresStore::new().await {
        Ok(store) => {
            info!("Postgres connected");
            metrics.database_connected.set(1.0);
            Arc::new(store)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to Postgres");
            return Err(format!("Postgres connection required for worker: {}", e).into());
        }
    };

    info!("Initializing Redis connection...");
    let cache: Arc<dyn CacheGateway> = match RedisCache::new().await {
        Ok(c) => {
            info!("Redis connected");
            metrics.cache_connected.set(1.0);
            Arc::new(c)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to Redis, falling back to in-process cache");
            Arc::new(MemoryCache::new())
        }
    };

    let series = Arc::new(RetryingProvider::new(
        store.clone(),
        screener_config.retry.clone(),
    ));
    let context = StageContext::new(series, store.clone(), store, cache, screener_config)
        .with_metrics(metrics.clone());
    let pipeline = ScreeningPipeline::new(context);

    let args: Vec<String> = env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("once") {
        return run_once(&pipeline, &args[1..]).await;
    }

    let port = config::get_http_port();
    let state = AppState::new(metrics.clone());
    tokio::spawn(async move {
        if let Err(e) = start_server(port, state).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("Starting job scheduler...");
    let scheduler = JobScheduler::new(pipeline)?;
    scheduler.start().await;

    info!("Worker started, waiting for shutdown signal...");
    signal::ctrl_c().await?;
    info!("Shutting down worker...");
    scheduler.stop().await;
    info!("Worker stopped");

    Ok(())
}

async fn run_once(
    pipeline: &ScreeningPipeline,
    args: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let as_of = match args.get(1) {
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")?,
        None => Local::now().date_naive(),
    };

    match args.first().map(String::as_str) {
        Some("universe") => {
            let report = pipeline.run_universe_scan(as_of).await?;
            info!(as_of = %as_of, passed = report.passed, total = report.total, "Universe scan finished");
        }
        Some("daily") => {
            let report = pipeline.run_daily(as_of).await?;
            let emitted = report.pattern.as_ref().map_or(0, |p| p.emitted);
            info!(as_of = %as_of, signals = emitted, "Daily run finished");
        }
        other => {
            return Err(format!(
                "unknown stage {:?}, expected `once universe|daily [YYYY-MM-DD]`",
                other
            )
            .into())
        }
    }

    Ok(())
}
