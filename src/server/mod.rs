//! HTTP server module
//!
//! Accepts connections with hyper, wraps every request in a server span and
//! dispatches it to the route handlers.
//!
//! # Example
//!
//! ```no_run
//! use otel_hello_service::config::Config;
//! use otel_hello_service::server::Server;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.server.port = 0;
//!
//! let server = Server::new(config).await?;
//! println!("Listening on {}", server.local_addr());
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

pub mod http_tracing;

use crate::config::Config;
use crate::handlers::{self, HttpResponse};
use crate::router::{Route, Router, RouterError};
use crate::upstream::{HttpUpstream, Upstream, UpstreamError};
use http_tracing::{record_response, request_span};
use hyper::body::Incoming;
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Instrument};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("Server error: {0}")]
    RuntimeError(String),

    #[error("Failed to create upstream client: {0}")]
    Upstream(#[from] UpstreamError),
}

/// State shared read-only by every connection
pub struct AppState {
    pub upstream: Arc<dyn Upstream>,
}

/// HTTP Server
///
/// Binding happens in the constructor, so port 0 can be used and the
/// assigned port read back with [`Server::local_addr`].
pub struct Server {
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Bind using the configured HTTP upstream
    pub async fn new(config: Config) -> Result<Self, ServerError> {
        let upstream = HttpUpstream::new(&config.upstream)?;
        Self::bind(config, Arc::new(upstream)).await
    }

    /// Bind `host:port` and serve `/example` from `upstream`
    ///
    /// # Returns
    ///
    /// * `Ok(Server)` - Bound server
    /// * `Err(ServerError::BindError)` - Port in use or address unavailable
    pub async fn bind(config: Config, upstream: Arc<dyn Upstream>) -> Result<Self, ServerError> {
        let addr = SocketAddr::new(config.server.host, config.server.port);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        info!("Server bound to {}", local_addr);

        Ok(Self {
            state: Arc::new(AppState { upstream }),
            listener,
            local_addr,
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the process exits
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves
    ///
    /// Each connection is handled in its own task. Accept errors are logged
    /// and do not stop the loop. Connections already accepted keep running
    /// after shutdown until they finish.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("Starting server on {}", self.local_addr);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down server");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);

                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { handle_request(req, state).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", peer_addr, e);
                }
            });
        }
    }
}

/// Handle one HTTP request inside its server span
async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<HttpResponse, Infallible> {
    let resolved = Router::resolve(req.method(), req.uri().path());
    let template = match &resolved {
        Ok(route) => Some(route.template()),
        Err(e) => e.route_template(),
    };

    let span = request_span(&req, template);
    let (parts, _body) = req.into_parts();

    let response = dispatch(&parts, resolved, &state)
        .instrument(span.clone())
        .await;

    record_response(&span, response.status());
    Ok(response)
}

async fn dispatch(
    parts: &Parts,
    resolved: Result<Route, RouterError>,
    state: &AppState,
) -> HttpResponse {
    info!("Handling {} {}", parts.method, parts.uri.path());

    match resolved {
        Ok(_) if parts.method == Method::OPTIONS => handlers::options_response(),
        Ok(Route::Index) => handlers::hello_world(&parts.headers),
        Ok(Route::Example) => handlers::example(state.upstream.as_ref()).await,
        Ok(Route::User { username }) => handlers::show_username(&parts.headers, &username),
        Err(RouterError::NotFound(path)) => {
            info!("No route for path: {}", path);
            handlers::not_found()
        }
        Err(e @ RouterError::MethodNotAllowed { .. }) => {
            warn!("{}", e);
            handlers::method_not_allowed()
        }
    }
}
