//! OTLP/gRPC span exporter

use super::init::TracingError;
use crate::config::{OtlpConfig, ENV_OTLP_ENDPOINT};
use opentelemetry_otlp::{SpanExporter, SpanExporterBuilder, WithExportConfig};
use std::time::Duration;
use tonic::transport::ClientTlsConfig;

/// Timeout for a single export call to the collector
const EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Give a scheme-less endpoint the scheme implied by `insecure`.
///
/// An explicit `http://` or `https://` scheme always wins.
pub fn normalize_endpoint(endpoint: &str, insecure: bool) -> String {
    let endpoint = endpoint.trim();
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else if insecure {
        format!("http://{}", endpoint)
    } else {
        format!("https://{}", endpoint)
    }
}

/// Build the OTLP exporter described by `config`
///
/// The gRPC channel is created lazily; nothing connects until the first
/// batch is exported.
pub fn build_exporter(config: &OtlpConfig) -> Result<SpanExporter, TracingError> {
    let raw = config
        .endpoint
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| TracingError::Exporter(format!("{} is not set", ENV_OTLP_ENDPOINT)))?;
    let endpoint = normalize_endpoint(raw, config.insecure);

    let mut builder = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint.clone())
        .with_timeout(EXPORT_TIMEOUT);

    if endpoint.starts_with("https://") {
        builder = builder.with_tls_config(ClientTlsConfig::new());
    }

    SpanExporterBuilder::from(builder)
        .build_span_exporter()
        .map_err(|e| TracingError::Exporter(format!("OTLP exporter for {}: {}", endpoint, e)))
}
