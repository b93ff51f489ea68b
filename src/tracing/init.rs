//! OpenTelemetry tracer initialization and lifecycle management
//!
//! This module builds the single tracer provider of the process, attaches one
//! batching span processor per enabled exporter, and flushes pending spans on
//! shutdown.

use super::azure_monitor::AzureMonitorExporter;
use super::otlp;
use crate::config::TracingConfig;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_sdk::export::trace::SpanExporter;
use opentelemetry_sdk::trace::{self as sdktrace, BatchSpanProcessor, Tracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use thiserror::Error;
use tracing::{info, warn};

/// Service identity attached to every exported span as `service.name`
pub const SERVICE_NAME: &str = "otel-hello-service";

/// Errors that can occur during tracing initialization
#[derive(Error, Debug)]
pub enum TracingError {
    #[error("Failed to initialize span exporter: {0}")]
    Exporter(String),

    #[error("Invalid Application Insights connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Tracer provider error: {0}")]
    Provider(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

/// RAII guard owning the process-wide tracer provider
///
/// Dropping the guard flushes pending spans. Use [`shutdown_tracing`] to
/// observe flush errors instead.
#[derive(Debug)]
pub struct TracingGuard {
    provider: TracerProvider,
    exporters: usize,
    active: bool,
}

impl TracingGuard {
    fn new(provider: TracerProvider, exporters: usize) -> Self {
        Self {
            provider,
            exporters,
            active: true,
        }
    }

    /// Whether at least one exporter is attached
    pub fn is_active(&self) -> bool {
        self.active && self.exporters > 0
    }

    /// Number of span processors registered with the provider
    pub fn exporter_count(&self) -> usize {
        self.exporters
    }

    /// Tracer bound to this provider, used by the OpenTelemetry layer
    pub fn tracer(&self) -> Tracer {
        self.provider.tracer(SERVICE_NAME)
    }

    /// The underlying provider
    pub fn provider(&self) -> &TracerProvider {
        &self.provider
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = self.provider.force_flush();
        }
    }
}

/// Resource describing this service
pub fn service_resource() -> Resource {
    Resource::default().merge(&Resource::new(vec![KeyValue::new(
        "service.name",
        SERVICE_NAME,
    )]))
}

/// Initialize the tracer provider with every enabled exporter
///
/// Must be called once, from inside a Tokio runtime, before the HTTP
/// listener accepts connections. Exporters connect lazily, so an unreachable
/// collector does not fail startup.
///
/// # Example
///
/// ```no_run
/// use otel_hello_service::config::TracingConfig;
/// use otel_hello_service::tracing::init::init_tracing;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = TracingConfig::default();
/// config.otlp.endpoint = Some("http://localhost:4317".to_string());
///
/// let _guard = init_tracing(&config)?;
/// // Guard will flush spans on drop
/// # Ok(())
/// # }
/// ```
pub fn init_tracing(config: &TracingConfig) -> Result<TracingGuard, TracingError> {
    let mut builder = TracerProvider::builder()
        .with_config(sdktrace::config().with_resource(service_resource()));
    let mut exporters = 0;

    if config.otlp.enabled {
        let exporter = otlp::build_exporter(&config.otlp)?;
        builder = builder.with_span_processor(batch_processor(exporter));
        exporters += 1;
        info!(insecure = config.otlp.insecure, "OTLP span exporter enabled");
    }

    if config.azure_monitor.enabled {
        let exporter = AzureMonitorExporter::from_config(&config.azure_monitor, SERVICE_NAME)?;
        builder = builder.with_span_processor(batch_processor(exporter));
        exporters += 1;
        info!("Azure Monitor span exporter enabled");
    }

    Ok(TracingGuard::new(builder.build(), exporters))
}

fn batch_processor<E>(exporter: E) -> BatchSpanProcessor<runtime::Tokio>
where
    E: SpanExporter + 'static,
{
    BatchSpanProcessor::builder(exporter, runtime::Tokio).build()
}

/// Explicitly flush all pending spans and release the provider
pub fn shutdown_tracing(mut guard: TracingGuard) -> Result<(), TracingError> {
    if guard.active {
        // Mark as inactive to prevent a second flush in Drop
        guard.active = false;
        for result in guard.provider.force_flush() {
            result.map_err(|e| TracingError::Provider(e.to_string()))?;
        }
    }
    Ok(())
}

/// Flush pending spans on process exit
///
/// Export failures (an unreachable collector, a rejected batch) are logged
/// and never turned into a failed exit.
pub fn finish_tracing(guard: TracingGuard) {
    if let Err(e) = shutdown_tracing(guard) {
        warn!("Failed to flush spans on shutdown: {}", e);
    }
}
