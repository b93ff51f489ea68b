//! W3C Trace Context Propagation
//!
//! Extracts the remote parent from incoming request headers and injects the
//! current span into outgoing request headers, using the
//! [W3C Trace Context](https://www.w3.org/TR/trace-context/) format.
//!
//! - **traceparent**: `00-{trace-id}-{span-id}-{trace-flags}`
//! - **tracestate**: optional vendor data, carried through unchanged
//!
//! # Example
//!
//! ```
//! use hyper::HeaderMap;
//! use opentelemetry::trace::TraceContextExt;
//! use otel_hello_service::tracing::propagation::extract_context;
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(
//!     "traceparent",
//!     "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".parse().unwrap(),
//! );
//!
//! let cx = extract_context(&headers);
//! assert!(cx.span().span_context().is_remote());
//! ```

use hyper::header::{HeaderName, HeaderValue};
use hyper::HeaderMap;
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Read-only view of HTTP headers for the propagator
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Writable view of HTTP headers for the propagator
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

/// Extract the remote trace context from request headers
///
/// Returns an empty context when `traceparent` is missing or malformed.
pub fn extract_context(headers: &HeaderMap) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(headers))
}

/// Inject `cx` into outgoing headers
///
/// Nothing is written when the context has no valid span.
pub fn inject_context(cx: &Context, headers: &mut HeaderMap) {
    TraceContextPropagator::new().inject_context(cx, &mut HeaderInjector(headers));
}

/// Inject the OpenTelemetry context of a `tracing` span into outgoing headers
pub fn inject_span(span: &Span, headers: &mut HeaderMap) {
    inject_context(&span.context(), headers);
}
