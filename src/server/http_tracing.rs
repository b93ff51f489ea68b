//! HTTP Request Tracing
//!
//! Opens the server span that wraps each request, following the HTTP
//! semantic conventions, and parents it on the inbound W3C trace context.

use crate::tracing::propagation::extract_context;
use hyper::header::{HOST, USER_AGENT};
use hyper::{Request, StatusCode};
use tracing::field::Empty;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Create the root span for an HTTP request
///
/// The exported name is `"{METHOD} {route}"`, or just the method when no
/// route matched. If the request carries a valid `traceparent`, the span
/// joins that trace.
pub fn request_span<B>(req: &Request<B>, route: Option<&'static str>) -> Span {
    let method = req.method().as_str();
    let name = match route {
        Some(route) => format!("{} {}", method, route),
        None => method.to_string(),
    };

    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let host = header_str(req, HOST)
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
        .unwrap_or("");
    let user_agent = header_str(req, USER_AGENT).unwrap_or("");

    let span = tracing::info_span!(
        "http.request",
        otel.name = %name,
        otel.kind = "server",
        otel.status_code = Empty,
        http.method = %method,
        http.target = %target,
        http.route = Empty,
        http.scheme = "http",
        http.host = %host,
        http.user_agent = %user_agent,
        http.status_code = Empty,
    );

    if let Some(route) = route {
        span.record("http.route", route);
    }

    span.set_parent(extract_context(req.headers()));
    span
}

/// Record the response status on the request span
///
/// 5xx responses mark the span as failed.
pub fn record_response(span: &Span, status: StatusCode) {
    span.record("http.status_code", status.as_u16());
    if status.is_server_error() {
        span.record("otel.status_code", "ERROR");
    }
}

fn header_str<B>(req: &Request<B>, name: hyper::header::HeaderName) -> Option<&str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}
