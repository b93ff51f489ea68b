//! Shared helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use otel_hello_service::config::{Config, UpstreamConfig};
use otel_hello_service::server::{Server, ServerError};
use otel_hello_service::upstream::{HttpUpstream, Upstream, UpstreamError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Upstream answering with a fixed body, or failing when `None`
pub struct StubUpstream(pub Option<&'static str>);

#[async_trait]
impl Upstream for StubUpstream {
    async fn fetch_json(&self) -> Result<Bytes, UpstreamError> {
        match self.0 {
            Some(body) => Ok(Bytes::from_static(body.as_bytes())),
            None => Err(UpstreamError::Client("stub upstream failure".into())),
        }
    }
}

/// Localhost, ephemeral port, no exporters
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.server.port = 0;
    config.tracing.otlp.enabled = false;
    config
}

/// Bind a server on an ephemeral port and run it in the background
pub async fn spawn_server(
    upstream: Arc<dyn Upstream>,
) -> (SocketAddr, JoinHandle<Result<(), ServerError>>) {
    let server = Server::bind(test_config(), upstream)
        .await
        .expect("Failed to bind test server");
    let addr = server.local_addr();
    (addr, tokio::spawn(server.run()))
}

/// Server whose `/example` route calls `url` over HTTP
pub async fn spawn_with_upstream_url(
    url: &str,
    timeout: Duration,
) -> (SocketAddr, JoinHandle<Result<(), ServerError>>) {
    let upstream = HttpUpstream::new(&UpstreamConfig {
        url: url.to_string(),
        timeout,
    })
    .expect("Failed to build upstream client");
    spawn_server(Arc::new(upstream)).await
}
