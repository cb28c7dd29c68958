//! Operations surface for the worker: liveness and Prometheus scrape only

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use crate::metrics::Metrics;

pub const SERVICE_NAME: &str = "limitflag-screener";

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<Metrics>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
        }
    }
}

/// `degraded` while the store is unreachable. The cache is optional, so a
/// missing Redis never degrades the worker.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthReport {
    pub status: &'static str,
    pub service: &'static str,
    pub uptime_seconds: u64,
    pub database_connected: bool,
    pub cache_connected: bool,
}

impl HealthReport {
    fn from_state(state: &AppState) -> Self {
        let database_connected = state.metrics.database_connected.get() > 0.0;
        Self {
            status: if database_connected { "healthy" } else { "degraded" },
            service: SERVICE_NAME,
            uptime_seconds: state.start_time.elapsed().as_secs(),
            database_connected,
            cache_connected: state.metrics.cache_connected.get() > 0.0,
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport::from_state(&state))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state.metrics.export().map_err(|e| {
        tracing::error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(port: u16, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port = port, service = SERVICE_NAME, "Operations endpoints listening");
    axum::serve(listener, create_router(state)).await
}
