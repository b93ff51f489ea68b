//! OpenTelemetry distributed tracing module
//!
//! Builds the process-wide tracer provider and wires `tracing` spans into it.
//!
//! # Features
//!
//! - OTLP gRPC export (plaintext or TLS)
//! - Azure Monitor (Application Insights) export
//! - Batch span processing, one processor per exporter
//! - Flush on shutdown through [`TracingGuard`]
//! - W3C Trace Context propagation
//!
//! # Example
//!
//! ```no_run
//! use otel_hello_service::config::Config;
//! use otel_hello_service::tracing::init_subscriber;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! let _guard = init_subscriber(&config, None)?;
//! // Spans are now exported; the guard flushes them on drop
//! # Ok(())
//! # }
//! ```

pub mod azure_monitor;
pub mod init;
pub mod otlp;
pub mod propagation;
pub mod subscriber;

pub use init::{finish_tracing, init_tracing, shutdown_tracing, TracingError, TracingGuard, SERVICE_NAME};
pub use subscriber::init_subscriber;
