//! Logging initialization with environment-based formatters
//!
//! - Production: structured JSON logs for aggregation
//! - Sandbox: colorful, human-readable logs for local screening runs

use crate::config::get_environment;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn is_production(env: &str) -> bool {
    matches!(env, "production" | "prod")
}

/// Filter used when `RUST_LOG` is unset. Sandbox runs see per-instrument
/// stage decisions, production keeps to stage summaries.
pub fn default_directives(env: &str) -> &'static str {
    if is_production(env) {
        "info"
    } else {
        "info,limitflag=debug"
    }
}

/// Install the global subscriber and announce `service` once it is live.
pub fn init_logging(service: &str) {
    let environment = get_environment();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&environment)));

    if is_production(&environment) {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true)
                    .with_writer(std::io::stdout),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).with_ansi(true))
            .init();
    }

    tracing::info!(service = service, environment = %environment, "Logging initialized");
}
