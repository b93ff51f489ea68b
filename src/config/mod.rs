//! Configuration module for the service
//!
//! The whole configuration is read from the process environment exactly once
//! at startup (see [`ConfigLoader`]) and then shared read-only. Nothing else in
//! the crate reads environment variables.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Environment variable names
// ============================================================================

pub const ENV_PORT: &str = "FLASK_PORT";
pub const ENV_HOST: &str = "FLASK_HOST";
pub const ENV_DEBUG: &str = "DEBUG";
pub const ENV_ENABLE_OTLP: &str = "ENABLE_OTLP_EXPORTER";
pub const ENV_ENABLE_AZURE_MONITOR: &str = "ENABLE_AZURE_MONITOR_EXPORTER";
pub const ENV_OTLP_ENDPOINT: &str = "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT";
pub const ENV_OTLP_INSECURE: &str = "OTEL_EXPORTER_OTLP_INSECURE";
pub const ENV_AZURE_CONNECTION_STRING: &str = "APPLICATIONINSIGHTS_CONNECTION_STRING";
pub const ENV_UPSTREAM_URL: &str = "EXAMPLE_UPSTREAM_URL";
pub const ENV_UPSTREAM_TIMEOUT: &str = "EXAMPLE_UPSTREAM_TIMEOUT_SECS";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} env var is not set (required when {required_by} is enabled)")]
    MissingSetting {
        name: &'static str,
        required_by: &'static str,
    },

    #[error("Invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub tracing: TracingConfig,
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigLoader::from_env()
    }

    /// Validate the configuration
    ///
    /// Only checks that every enabled exporter has its required setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let otlp = &self.tracing.otlp;
        if otlp.enabled && is_blank(otlp.endpoint.as_deref()) {
            return Err(ConfigError::MissingSetting {
                name: ENV_OTLP_ENDPOINT,
                required_by: ENV_ENABLE_OTLP,
            });
        }

        let azure = &self.tracing.azure_monitor;
        if azure.enabled && is_blank(azure.connection_string.as_deref()) {
            return Err(ConfigError::MissingSetting {
                name: ENV_AZURE_CONNECTION_STRING,
                required_by: ENV_ENABLE_AZURE_MONITOR,
            });
        }

        Ok(())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Verbose mode: debug-level, human readable logs
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

// ============================================================================
// Tracing Configuration
// ============================================================================

/// Span export configuration.
///
/// Each exporter has its own gate. An enabled exporter must carry its
/// required setting, which [`Config::validate`] enforces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TracingConfig {
    pub otlp: OtlpConfig,
    pub azure_monitor: AzureMonitorConfig,
}

impl TracingConfig {
    /// Number of exporters that will be attached to the tracer provider
    pub fn enabled_exporters(&self) -> usize {
        usize::from(self.otlp.enabled) + usize::from(self.azure_monitor.enabled)
    }
}

/// OTLP (OpenTelemetry Protocol) exporter configuration.
///
/// Spans are exported over gRPC. When `endpoint` carries no scheme,
/// `insecure` decides between plaintext (`http://`) and TLS (`https://`).
#[derive(Debug, Clone, PartialEq)]
pub struct OtlpConfig {
    /// Default: true
    pub enabled: bool,
    pub endpoint: Option<String>,
    /// Default: true
    pub insecure: bool,
}

impl Default for OtlpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            insecure: true,
        }
    }
}

/// Azure Monitor (Application Insights) exporter configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AzureMonitorConfig {
    /// Default: false
    pub enabled: bool,
    pub connection_string: Option<String>,
}

// ============================================================================
// Upstream Configuration
// ============================================================================

/// Target of the outbound call made by `/example`
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamConfig {
    pub url: String,
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout: default_upstream_timeout(),
        }
    }
}

fn default_upstream_url() -> String {
    "http://httpbin.org/get".to_string()
}

fn default_upstream_timeout() -> Duration {
    Duration::from_secs(10)
}
