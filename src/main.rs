//! OpenTelemetry Hello Service
//!
//! Configuration comes from the environment; see `otel_hello_service::config`.

use anyhow::Context;
use clap::Parser;
use otel_hello_service::config::Config;
use otel_hello_service::server::Server;
use otel_hello_service::tracing::{finish_tracing, init_subscriber};
use tracing::{info, warn};

/// Hello-world HTTP service with OpenTelemetry tracing
#[derive(Parser, Debug)]
#[command(name = "otel-hello-service")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Configuration errors abort before anything is bound
    let config = Config::from_env().context("Invalid configuration")?;

    let guard = init_subscriber(&config, args.log_level.as_deref())
        .context("Failed to initialize tracing")?;

    info!(
        "Starting otel-hello-service v{} ({} span exporter(s))",
        otel_hello_service::VERSION,
        guard.exporter_count()
    );

    let server = Server::new(config).await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    finish_tracing(guard);
    Ok(())
}
