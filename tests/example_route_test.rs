//! `/example` route tests against a simulated upstream
//!
//! Test Coverage:
//! - Successful passthrough is byte-for-byte
//! - Upstream HTTP status is not inspected
//! - Invalid JSON, scalar JSON, timeout and connection refused degrade to the
//!   error body

mod common;

use common::spawn_with_upstream_url;
use otel_hello_service::handlers::ERROR_BODY;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_upstream(template: ResponseTemplate) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get"))
        .respond_with(template)
        .mount(&mock_server)
        .await;
    mock_server
}

#[tokio::test]
async fn test_example_passes_upstream_body_verbatim() {
    let payload = "{ \"args\": {},\n  \"url\": \"http://httpbin.org/get\", \"n\": 1.50 }";
    let upstream =
        mock_upstream(ResponseTemplate::new(200).set_body_raw(payload, "application/json")).await;

    let (addr, handle) =
        spawn_with_upstream_url(&format!("{}/get", upstream.uri()), Duration::from_secs(5)).await;

    let response = reqwest::get(format!("http://{}/example", addr))
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.text().await.unwrap(), payload);

    handle.abort();
}

#[tokio::test]
async fn test_example_ignores_upstream_status() {
    let payload = r#"{"error":"upstream unavailable"}"#;
    let upstream =
        mock_upstream(ResponseTemplate::new(503).set_body_raw(payload, "application/json")).await;

    let (addr, handle) =
        spawn_with_upstream_url(&format!("{}/get", upstream.uri()), Duration::from_secs(5)).await;

    let response = reqwest::get(format!("http://{}/example", addr)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), payload);

    handle.abort();
}

#[tokio::test]
async fn test_example_invalid_json_degrades() {
    let upstream =
        mock_upstream(ResponseTemplate::new(200).set_body_raw("<html>oops</html>", "text/html"))
            .await;

    let (addr, handle) =
        spawn_with_upstream_url(&format!("{}/get", upstream.uri()), Duration::from_secs(5)).await;

    let response = reqwest::get(format!("http://{}/example", addr)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().get("access-control-allow-origin").is_none());
    assert_eq!(response.text().await.unwrap(), ERROR_BODY);

    handle.abort();
}

#[tokio::test]
async fn test_example_scalar_json_degrades() {
    for scalar in ["42", "\"x\"", "null", "true"] {
        let upstream =
            mock_upstream(ResponseTemplate::new(200).set_body_raw(scalar, "application/json"))
                .await;

        let (addr, handle) =
            spawn_with_upstream_url(&format!("{}/get", upstream.uri()), Duration::from_secs(5))
                .await;

        let response = reqwest::get(format!("http://{}/example", addr)).await.unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), ERROR_BODY, "body {}", scalar);

        handle.abort();
    }
}

#[tokio::test]
async fn test_example_array_passthrough() {
    let payload = "[1, {\"a\": null}]";
    let upstream =
        mock_upstream(ResponseTemplate::new(200).set_body_raw(payload, "application/json")).await;

    let (addr, handle) =
        spawn_with_upstream_url(&format!("{}/get", upstream.uri()), Duration::from_secs(5)).await;

    let response = reqwest::get(format!("http://{}/example", addr)).await.unwrap();
    assert_eq!(response.text().await.unwrap(), payload);

    handle.abort();
}

#[tokio::test]
async fn test_example_timeout_degrades() {
    let upstream = mock_upstream(
        ResponseTemplate::new(200)
            .set_body_raw("{}", "application/json")
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let (addr, handle) = spawn_with_upstream_url(
        &format!("{}/get", upstream.uri()),
        Duration::from_millis(200),
    )
    .await;

    let response = reqwest::get(format!("http://{}/example", addr)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), ERROR_BODY);

    handle.abort();
}

#[tokio::test]
async fn test_example_connection_refused_degrades() {
    let (addr, handle) =
        spawn_with_upstream_url("http://127.0.0.1:1/get", Duration::from_secs(2)).await;

    let response = reqwest::get(format!("http://{}/example", addr)).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), ERROR_BODY);

    handle.abort();
}
