//! HTTP Server Integration Tests
//!
//! Drives a real server bound to an ephemeral port with reqwest.
//!
//! Test Coverage:
//! - Greeting and username routes
//! - Username escaping (unicode, JSON-special, empty)
//! - CORS and content-type headers
//! - 404 / 405 / OPTIONS / HEAD
//! - Concurrent requests

mod common;

use common::{spawn_server, StubUpstream};
use serde_json::Value;
use std::sync::Arc;

async fn get_json(url: String) -> (reqwest::StatusCode, reqwest::header::HeaderMap, Value) {
    let response = reqwest::get(url).await.expect("Failed to send request");
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.json::<Value>().await.expect("Body should be JSON");
    (status, headers, body)
}

#[tokio::test]
async fn test_index_returns_greeting() {
    let (addr, handle) = spawn_server(Arc::new(StubUpstream(None))).await;

    let (status, headers, body) = get_json(format!("http://{}/", addr)).await;

    assert_eq!(status, 200);
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(body, serde_json::json!({ "message": "Hello World" }));

    handle.abort();
}

#[tokio::test]
async fn test_index_ignores_request_headers() {
    let (addr, handle) = spawn_server(Arc::new(StubUpstream(None))).await;

    let client = reqwest::Client::new();
    let plain = client
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let decorated = client
        .get(format!("http://{}/", addr))
        .header("X-Custom", "value")
        .header("Accept", "text/html")
        .header("traceparent", "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert_eq!(plain, decorated);
    assert_eq!(plain, r#"{"message":"Hello World"}"#);

    handle.abort();
}

#[tokio::test]
async fn test_user_route_greets_username() {
    let (addr, handle) = spawn_server(Arc::new(StubUpstream(None))).await;

    let (status, headers, body) = get_json(format!("http://{}/user/alice", addr)).await;

    assert_eq!(status, 200);
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(body["message"], "Hello World: alice");

    handle.abort();
}

#[tokio::test]
async fn test_user_route_unicode_and_json_special_characters() {
    let (addr, handle) = spawn_server(Arc::new(StubUpstream(None))).await;

    let cases = [
        ("J%C3%B6rg", "Jörg"),
        ("%E5%B1%B1%E7%94%B0", "山田"),
        ("a%22b%5Cc", "a\"b\\c"),
        ("%7B%22x%22%3A1%7D", "{\"x\":1}"),
        ("tab%09here", "tab\there"),
    ];

    for (encoded, expected) in cases {
        let (status, _, body) = get_json(format!("http://{}/user/{}", addr, encoded)).await;
        assert_eq!(status, 200, "username {:?}", expected);
        assert_eq!(
            body["message"],
            format!("Hello World: {}", expected),
            "username {:?}",
            expected
        );
    }

    handle.abort();
}

#[tokio::test]
async fn test_user_route_empty_username() {
    let (addr, handle) = spawn_server(Arc::new(StubUpstream(None))).await;

    let (status, _, body) = get_json(format!("http://{}/user/", addr)).await;

    assert_eq!(status, 200);
    assert_eq!(body["message"], "Hello World: ");

    handle.abort();
}

#[tokio::test]
async fn test_unknown_path_returns_404() {
    let (addr, handle) = spawn_server(Arc::new(StubUpstream(None))).await;

    for path in ["/missing", "/user", "/user/a/b", "/user/a%2Fb", "/example/"] {
        let response = reqwest::get(format!("http://{}{}", addr, path))
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 404, "path {}", path);
    }

    handle.abort();
}

#[tokio::test]
async fn test_post_returns_405_with_allow_header() {
    let (addr, handle) = spawn_server(Arc::new(StubUpstream(None))).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/user/alice", addr))
        .body("ignored")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 405);
    assert_eq!(response.headers()["allow"], "GET, HEAD, OPTIONS");

    handle.abort();
}

#[tokio::test]
async fn test_options_and_head() {
    let (addr, handle) = spawn_server(Arc::new(StubUpstream(None))).await;
    let client = reqwest::Client::new();

    let options = client
        .request(reqwest::Method::OPTIONS, format!("http://{}/", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(options.status(), 200);
    assert_eq!(options.headers()["allow"], "GET, HEAD, OPTIONS");

    let head = client.head(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(head.status(), 200);
    assert_eq!(head.headers()["access-control-allow-origin"], "*");
    assert!(head.bytes().await.unwrap().is_empty());

    handle.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_do_not_interfere() {
    let (addr, handle) = spawn_server(Arc::new(StubUpstream(None))).await;

    let mut tasks = Vec::new();
    for i in 0..20 {
        let name = if i % 2 == 0 { "a" } else { "b" };
        tasks.push(tokio::spawn(async move {
            let (_, _, body) = get_json(format!("http://{}/user/{}", addr, name)).await;
            (name, body)
        }));
    }

    for task in tasks {
        let (name, body) = task.await.unwrap();
        assert_eq!(body["message"], format!("Hello World: {}", name));
    }

    handle.abort();
}
