//! Configuration loader reading environment variables

use super::{
    Config, ConfigError, ServerConfig, ENV_AZURE_CONNECTION_STRING, ENV_DEBUG,
    ENV_ENABLE_AZURE_MONITOR, ENV_ENABLE_OTLP, ENV_HOST, ENV_OTLP_ENDPOINT, ENV_OTLP_INSECURE,
    ENV_PORT, ENV_UPSTREAM_TIMEOUT, ENV_UPSTREAM_URL,
};
use std::net::IpAddr;
use std::time::Duration;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    ///
    /// Unset variables take their documented defaults. The result is
    /// validated before it is returned.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        config.server = ServerConfig {
            host: parse_or(&lookup, ENV_HOST, config.server.host, |v| {
                v.parse::<IpAddr>().map_err(|e| e.to_string())
            })?,
            port: parse_or(&lookup, ENV_PORT, config.server.port, |v| {
                v.parse::<u16>().map_err(|e| e.to_string())
            })?,
            debug: flag_or(&lookup, ENV_DEBUG, config.server.debug),
        };

        let otlp = &mut config.tracing.otlp;
        otlp.enabled = flag_or(&lookup, ENV_ENABLE_OTLP, otlp.enabled);
        otlp.endpoint = lookup(ENV_OTLP_ENDPOINT);
        otlp.insecure = flag_or(&lookup, ENV_OTLP_INSECURE, otlp.insecure);

        let azure = &mut config.tracing.azure_monitor;
        azure.enabled = flag_or(&lookup, ENV_ENABLE_AZURE_MONITOR, azure.enabled);
        azure.connection_string = lookup(ENV_AZURE_CONNECTION_STRING);

        if let Some(url) = lookup(ENV_UPSTREAM_URL) {
            config.upstream.url = url;
        }
        config.upstream.timeout =
            parse_or(&lookup, ENV_UPSTREAM_TIMEOUT, config.upstream.timeout, |v| {
                v.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| e.to_string())
            })?;

        config.validate()?;
        Ok(config)
    }
}

/// Interpret a flag value.
///
/// Empty, `0`, `false`, `no` and `off` are false; anything else is true.
pub(crate) fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

fn flag_or<F>(lookup: &F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).map_or(default, |v| parse_flag(&v))
}

fn parse_or<F, T, P>(lookup: &F, name: &'static str, default: T, parse: P) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    P: FnOnce(&str) -> Result<T, String>,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => parse(value.trim()).map_err(|reason| ConfigError::InvalidValue {
            name,
            value,
            reason,
        }),
    }
}
