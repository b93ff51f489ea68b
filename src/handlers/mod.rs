//! Route handlers
//!
//! Every handler runs inside the request span opened by the server, so
//! spans created here are children of it.

use crate::router::ALLOWED_METHODS;
use crate::upstream::Upstream;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW, CONTENT_TYPE};
use hyper::{HeaderMap, Response, StatusCode};
use serde_json::json;
use tracing::{debug, error, info, info_span, Span};

/// Response type shared by all handlers
pub type HttpResponse = Response<Full<Bytes>>;

/// Body served by `/example` when the upstream call fails
pub const ERROR_BODY: &str = "an error has occurred";

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// 200 JSON response with the CORS wildcard header
pub fn json_response(body: impl Into<Bytes>) -> HttpResponse {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Full::new(body.into()))
        .expect("Failed to build JSON response")
}

/// Plain-text response without CORS headers
pub fn text_response(status: StatusCode, body: &'static str) -> HttpResponse {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, TEXT_CONTENT_TYPE)
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .expect("Failed to build text response")
}

fn message_response(message: &str) -> HttpResponse {
    json_response(json!({ "message": message }).to_string())
}

/// `GET /`
pub fn hello_world(headers: &HeaderMap) -> HttpResponse {
    info!(headers = ?headers, "Request headers");
    message_response("Hello World")
}

/// `GET /example`
///
/// Serves the upstream JSON unchanged. Any failure degrades to a 200 with
/// [`ERROR_BODY`].
pub async fn example(upstream: &dyn Upstream) -> HttpResponse {
    match upstream.fetch_json().await {
        Ok(body) => json_response(body),
        Err(e) => {
            error!(error = %e, "Upstream call failed");
            text_response(StatusCode::OK, ERROR_BODY)
        }
    }
}

/// `GET /user/{username}`
pub fn show_username(headers: &HeaderMap, username: &str) -> HttpResponse {
    info!(headers = ?headers, "Request headers");
    trace_username(&Span::current(), username);
    message_response(&format!("Hello World: {}", username))
}

/// Open `show_username` under `parent` and `show_username_inner` under it
///
/// Both spans are closed, inner first, when this returns.
pub fn trace_username(parent: &Span, username: &str) {
    let outer = info_span!(parent: parent, "show_username", user.name = %username);
    outer.in_scope(|| {
        info!(username = %username, "Showing username");

        let inner = info_span!(parent: &outer, "show_username_inner");
        inner.in_scope(|| {
            debug!("Inside nested span");
        });
    });
}

/// 404 for paths no route matches
pub fn not_found() -> HttpResponse {
    text_response(StatusCode::NOT_FOUND, "Not Found")
}

/// 405 for unsupported methods on a known route
pub fn method_not_allowed() -> HttpResponse {
    let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    response
        .headers_mut()
        .insert(ALLOW, hyper::header::HeaderValue::from_static(ALLOWED_METHODS));
    response
}

/// 200 with an empty body and the `Allow` header
pub fn options_response() -> HttpResponse {
    Response::builder()
        .status(StatusCode::OK)
        .header(ALLOW, ALLOWED_METHODS)
        .header(ACCESS_CONTROL_ALLOW_ORIGIN, "*")
        .body(Full::new(Bytes::new()))
        .expect("Failed to build OPTIONS response")
}
