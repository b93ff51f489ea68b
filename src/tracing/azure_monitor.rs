//! Azure Monitor (Application Insights) span exporter
//!
//! Converts finished spans into Application Insights telemetry envelopes and
//! posts them to the ingestion endpoint named by the connection string.
//!
//! # Mapping
//!
//! | Span kind | Envelope | Base type |
//! |-----------|----------|-----------|
//! | server, consumer | `Microsoft.ApplicationInsights.Request` | `RequestData` |
//! | everything else | `Microsoft.ApplicationInsights.RemoteDependency` | `RemoteDependencyData` |
//!
//! The trace id becomes `ai.operation.id` and the parent span id becomes
//! `ai.operation.parentId`, so the portal can rebuild the request tree.
//!
//! # Example
//!
//! ```
//! use otel_hello_service::tracing::azure_monitor::ConnectionString;
//!
//! let cs = ConnectionString::parse(
//!     "InstrumentationKey=00000000-0000-0000-0000-000000000000;IngestionEndpoint=https://westeurope-5.in.applicationinsights.azure.com/",
//! ).unwrap();
//! assert_eq!(
//!     cs.track_url(),
//!     "https://westeurope-5.in.applicationinsights.azure.com/v2.1/track"
//! );
//! ```

use super::init::TracingError;
use crate::config::{AzureMonitorConfig, ENV_AZURE_CONNECTION_STRING};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::BoxFuture;
use opentelemetry::trace::{SpanId, SpanKind, Status, TraceError};
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

/// Ingestion endpoint used when the connection string does not name one
pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";

/// Timeout for a single POST to the ingestion endpoint
const EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

const REQUEST_ENVELOPE: &str = "Microsoft.ApplicationInsights.Request";
const DEPENDENCY_ENVELOPE: &str = "Microsoft.ApplicationInsights.RemoteDependency";

/// Parsed Application Insights connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub instrumentation_key: String,
    pub ingestion_endpoint: String,
}

impl ConnectionString {
    /// Parse `Key=Value;Key=Value` pairs. Keys are case-insensitive and
    /// unknown keys are ignored.
    pub fn parse(raw: &str) -> Result<Self, TracingError> {
        let mut instrumentation_key = None;
        let mut ingestion_endpoint = None;

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                TracingError::InvalidConnectionString(format!(
                    "segment {:?} is not a Key=Value pair",
                    segment
                ))
            })?;
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "instrumentationkey" => instrumentation_key = Some(value.to_string()),
                "ingestionendpoint" => {
                    ingestion_endpoint = Some(value.trim_end_matches('/').to_string())
                }
                _ => {}
            }
        }

        let instrumentation_key = instrumentation_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TracingError::InvalidConnectionString("InstrumentationKey is missing".into())
            })?;

        let ingestion_endpoint = match ingestion_endpoint {
            Some(endpoint) if endpoint.is_empty() => {
                return Err(TracingError::InvalidConnectionString(
                    "IngestionEndpoint is empty".into(),
                ))
            }
            Some(endpoint) => endpoint,
            None => DEFAULT_INGESTION_ENDPOINT.to_string(),
        };

        Ok(Self {
            instrumentation_key,
            ingestion_endpoint,
        })
    }

    /// URL that accepts batches of telemetry envelopes
    pub fn track_url(&self) -> String {
        format!("{}/v2.1/track", self.ingestion_endpoint)
    }
}

/// Exporter-side view of a finished span
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
    pub name: String,
    pub kind: SpanKind,
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub start_time: SystemTime,
    pub end_time: SystemTime,
    pub attributes: BTreeMap<String, String>,
    pub is_error: bool,
}

impl From<&SpanData> for SpanRecord {
    fn from(span: &SpanData) -> Self {
        let parent_span_id =
            (span.parent_span_id != SpanId::INVALID).then(|| span.parent_span_id.to_string());

        Self {
            name: span.name.to_string(),
            kind: span.span_kind.clone(),
            trace_id: span.span_context.trace_id().to_string(),
            span_id: span.span_context.span_id().to_string(),
            parent_span_id,
            start_time: span.start_time,
            end_time: span.end_time,
            attributes: span
                .attributes
                .iter()
                .map(|kv| (kv.key.as_str().to_string(), kv.value.as_str().into_owned()))
                .collect(),
            is_error: matches!(span.status, Status::Error { .. }),
        }
    }
}

impl SpanRecord {
    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    fn duration(&self) -> Duration {
        self.end_time
            .duration_since(self.start_time)
            .unwrap_or_default()
    }

    fn is_request(&self) -> bool {
        matches!(self.kind, SpanKind::Server | SpanKind::Consumer)
    }

    fn status_code(&self) -> Option<u16> {
        self.attribute("http.status_code")?.parse().ok()
    }

    fn succeeded(&self) -> bool {
        !self.is_error && self.status_code().map_or(true, |code| code < 400)
    }

    fn url(&self) -> Option<String> {
        if let Some(url) = self.attribute("http.url") {
            return Some(url.to_string());
        }
        let target = self.attribute("http.target")?;
        let host = self.attribute("http.host")?;
        let scheme = self.attribute("http.scheme").unwrap_or("http");
        Some(format!("{}://{}{}", scheme, host, target))
    }
}

/// Application Insights telemetry envelope
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub name: &'static str,
    pub time: String,
    #[serde(rename = "iKey")]
    pub instrumentation_key: String,
    pub tags: BTreeMap<&'static str, String>,
    pub data: EnvelopeData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeData {
    pub base_type: &'static str,
    pub base_data: BaseData,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BaseData {
    Request(RequestData),
    Dependency(DependencyData),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    pub ver: u8,
    pub id: String,
    pub name: String,
    pub duration: String,
    pub response_code: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyData {
    pub ver: u8,
    pub id: String,
    pub name: String,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_code: Option<String>,
    pub success: bool,
    #[serde(rename = "type")]
    pub dependency_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub properties: BTreeMap<String, String>,
}

/// Format a duration the way Application Insights expects: `D.HH:MM:SS.ffffff`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{}.{:02}:{:02}:{:02}.{:06}",
        secs / 86_400,
        (secs / 3_600) % 24,
        (secs / 60) % 60,
        secs % 60,
        duration.subsec_micros()
    )
}

/// Convert one span into its telemetry envelope
pub fn to_envelope(record: &SpanRecord, instrumentation_key: &str, role: &str) -> Envelope {
    let mut tags = BTreeMap::new();
    tags.insert("ai.operation.id", record.trace_id.clone());
    tags.insert("ai.operation.name", record.name.clone());
    tags.insert("ai.cloud.role", role.to_string());
    if let Some(parent) = &record.parent_span_id {
        tags.insert("ai.operation.parentId", parent.clone());
    }

    let duration = format_duration(record.duration());
    let properties = record.attributes.clone();

    let (name, data) = if record.is_request() {
        let base_data = BaseData::Request(RequestData {
            ver: 2,
            id: record.span_id.clone(),
            name: record.name.clone(),
            duration,
            response_code: record
                .status_code()
                .map_or_else(|| "0".to_string(), |c| c.to_string()),
            success: record.succeeded(),
            url: record.url(),
            properties,
        });
        (
            REQUEST_ENVELOPE,
            EnvelopeData {
                base_type: "RequestData",
                base_data,
            },
        )
    } else {
        let is_client = matches!(record.kind, SpanKind::Client | SpanKind::Producer);
        let base_data = BaseData::Dependency(DependencyData {
            ver: 2,
            id: record.span_id.clone(),
            name: record.name.clone(),
            duration,
            result_code: record.status_code().map(|c| c.to_string()),
            success: record.succeeded(),
            dependency_type: if is_client { "HTTP" } else { "InProc" },
            data: if is_client { record.url() } else { None },
            properties,
        });
        (
            DEPENDENCY_ENVELOPE,
            EnvelopeData {
                base_type: "RemoteDependencyData",
                base_data,
            },
        )
    };

    Envelope {
        name,
        time: DateTime::<Utc>::from(record.start_time).to_rfc3339_opts(SecondsFormat::Micros, true),
        instrumentation_key: instrumentation_key.to_string(),
        tags,
        data,
    }
}

/// Span exporter posting to Application Insights
#[derive(Debug)]
pub struct AzureMonitorExporter {
    client: reqwest::Client,
    connection: ConnectionString,
    role: String,
}

impl AzureMonitorExporter {
    /// Create an exporter for an already parsed connection string
    pub fn new(connection: ConnectionString, role: impl Into<String>) -> Result<Self, TracingError> {
        let client = reqwest::Client::builder()
            .timeout(EXPORT_TIMEOUT)
            .build()
            .map_err(|e| TracingError::Exporter(e.to_string()))?;

        Ok(Self {
            client,
            connection,
            role: role.into(),
        })
    }

    /// Create an exporter from the service configuration
    pub fn from_config(config: &AzureMonitorConfig, role: &str) -> Result<Self, TracingError> {
        let raw = config
            .connection_string
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                TracingError::InvalidConnectionString(format!(
                    "{} is not set",
                    ENV_AZURE_CONNECTION_STRING
                ))
            })?;
        Self::new(ConnectionString::parse(raw)?, role)
    }

    pub fn connection(&self) -> &ConnectionString {
        &self.connection
    }
}

impl SpanExporter for AzureMonitorExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let envelopes: Vec<Envelope> = batch
            .iter()
            .map(|span| {
                to_envelope(
                    &SpanRecord::from(span),
                    &self.connection.instrumentation_key,
                    &self.role,
                )
            })
            .collect();
        let client = self.client.clone();
        let url = self.connection.track_url();

        Box::pin(async move {
            if envelopes.is_empty() {
                return Ok(());
            }

            let response = client
                .post(url)
                .json(&envelopes)
                .send()
                .await
                .map_err(|e| TraceError::from(format!("Azure Monitor export failed: {}", e)))?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(TraceError::from(format!(
                    "Azure Monitor ingestion returned {}",
                    status
                )))
            }
        })
    }
}
