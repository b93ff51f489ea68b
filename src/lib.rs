//! OpenTelemetry Hello Service Library
//!
//! A small HTTP service whose requests are traced with OpenTelemetry and
//! exported over OTLP and/or to Azure Monitor.
//!
//! # Routes
//!
//! - `GET /` - fixed greeting
//! - `GET /example` - proxies a JSON document from an upstream service
//! - `GET /user/{username}` - greeting with the username, inside nested spans
//!
//! # Example
//!
//! ```no_run
//! use otel_hello_service::{config::Config, server::Server, tracing::init_subscriber};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let _guard = init_subscriber(&config, None)?;
//!     let server = Server::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod handlers;
pub mod router;
pub mod server;
pub mod tracing;
pub mod upstream;

// Re-export commonly used types
pub use config::Config;
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
