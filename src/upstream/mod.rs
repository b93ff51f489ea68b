//! Upstream JSON source used by the `/example` route
//!
//! The route depends on the [`Upstream`] trait so tests can substitute a
//! stub; production uses [`HttpUpstream`], which performs one traced GET
//! with W3C context injected into the outbound headers.

use crate::config::UpstreamConfig;
use async_trait::async_trait;
use bytes::Bytes;
use hyper::HeaderMap;
use serde_json::Value;
use thiserror::Error;
use tracing::field::Empty;
use tracing::Span;

/// Upstream call errors
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upstream returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Upstream JSON is a {0}, expected an object or array")]
    NotADocument(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Source of the JSON document served by `/example`
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch the document and return its bytes unchanged
    ///
    /// The bytes are guaranteed to parse as a JSON object or array.
    async fn fetch_json(&self) -> Result<Bytes, UpstreamError>;
}

/// Upstream reached over HTTP with reqwest
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    url: String,
}

impl HttpUpstream {
    /// Create a client for `config.url` with the configured request timeout
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    #[tracing::instrument(
        name = "upstream.fetch",
        skip(self),
        fields(
            otel.name = "GET",
            otel.kind = "client",
            http.method = "GET",
            http.url = Empty,
            http.status_code = Empty,
        ),
        err
    )]
    async fn fetch_json(&self) -> Result<Bytes, UpstreamError> {
        let span = Span::current();
        span.record("http.url", self.url.as_str());

        let mut headers = HeaderMap::new();
        crate::tracing::propagation::inject_span(&span, &mut headers);

        let response = self.client.get(&self.url).headers(headers).send().await?;
        span.record("http.status_code", response.status().as_u16());

        // Status is not checked: any JSON object or array is served as-is
        let body = response.bytes().await?;
        check_document(&serde_json::from_slice::<Value>(&body)?)?;

        tracing::debug!(bytes = body.len(), "Upstream response received");
        Ok(body)
    }
}

/// Only objects and arrays are served; bare scalars and `null` are rejected
fn check_document(value: &Value) -> Result<(), UpstreamError> {
    match value {
        Value::Object(_) | Value::Array(_) => Ok(()),
        Value::Null => Err(UpstreamError::NotADocument("null")),
        Value::Bool(_) => Err(UpstreamError::NotADocument("boolean")),
        Value::Number(_) => Err(UpstreamError::NotADocument("number")),
        Value::String(_) => Err(UpstreamError::NotADocument("string")),
    }
}
