//! Tracing subscriber setup with layered architecture
//!
//! ```text
//! Registry
//!   ├── OpenTelemetry Layer (spans → tracer provider → exporters)
//!   ├── EnvFilter (RUST_LOG, else the configured level)
//!   └── Fmt Layer (JSON lines, or human readable in debug mode)
//! ```
//!
//! The OpenTelemetry layer is always installed, even with zero exporters, so
//! spans carry valid trace ids and W3C context propagates through the
//! service either way.

use crate::config::Config;
use crate::tracing::init::{init_tracing, TracingError, TracingGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Crates whose own spans would otherwise be exported alongside ours
const QUIET_TARGETS: &str = "h2=warn,hyper=warn,tonic=warn,tower=warn,reqwest=warn";

/// Default log level when neither `RUST_LOG` nor an explicit level is given
pub fn default_level(config: &Config) -> &'static str {
    if config.server.debug {
        "debug"
    } else {
        "info"
    }
}

/// Build the filter: `RUST_LOG` first, then `level`
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},{}", level, QUIET_TARGETS)))
}

/// Initialize the tracer provider and install the global subscriber
///
/// # Arguments
///
/// * `config` - Service configuration (exporters and debug flag)
/// * `log_level` - Explicit level, overriding the debug-derived default
///
/// # Returns
///
/// * `Ok(TracingGuard)` - Guard owning the tracer provider
/// * `Err(TracingError)` - Exporter setup failed or a subscriber is already set
pub fn init_subscriber(
    config: &Config,
    log_level: Option<&str>,
) -> Result<TracingGuard, TracingError> {
    let guard = init_tracing(&config.tracing)?;

    let env_filter = env_filter(log_level.unwrap_or_else(|| default_level(config)));
    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(guard.tracer());

    let result = if config.server.debug {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_line_number(true);

        let subscriber = tracing_subscriber::registry()
            .with(telemetry_layer)
            .with(env_filter)
            .with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true);

        let subscriber = tracing_subscriber::registry()
            .with(telemetry_layer)
            .with(env_filter)
            .with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    };

    result.map_err(|e| {
        TracingError::Subscriber(format!(
            "Failed to set global subscriber (may already be initialized): {}",
            e
        ))
    })?;

    Ok(guard)
}
