//! Meter configuration sourced from environment variables.

use std::env;
use std::fs;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default reporting interval when `METER_INTERVAL_SECS` is unset.
pub const DEFAULT_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid METER_INTERVAL_SECS {value:?}: {reason}")]
    InvalidInterval { value: String, reason: String },

    #[error("invalid PROMETHEUS_GATEWAY {value:?}")]
    InvalidGateway {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Settings for a meter registry.
///
/// Gateway pushing stays disabled unless both `gateway` and `metric_key` are
/// present; local log reporting works either way.
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// Time between report cycles.
    pub interval: Duration,
    /// Base URL of the Prometheus push gateway, e.g. `http://pushgw:9091`.
    pub gateway: Option<String>,
    /// Metric name used in every pushed sample.
    pub metric_key: Option<String>,
    /// Instance label for pushed series, defaults to the local hostname.
    pub instance: String,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            gateway: None,
            metric_key: None,
            instance: hostname(),
        }
    }
}

impl MeterConfig {
    /// Load from process environment variables:
    ///
    /// - `METER_INTERVAL_SECS`: whole seconds between cycles (default 15)
    /// - `PROMETHEUS_GATEWAY`: push gateway base URL (optional)
    /// - `PROMETHEUS_KEY`: metric name for pushed samples (optional)
    /// - `METER_INSTANCE`: instance label override (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary lookup function. Unset and blank values fall
    /// back to defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let interval = match trimmed(get("METER_INTERVAL_SECS")) {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .map_err(|err| ConfigError::InvalidInterval {
                        value: raw.clone(),
                        reason: err.to_string(),
                    })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidInterval {
                        value: raw,
                        reason: "interval must be at least one second".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_INTERVAL_SECS),
        };

        let gateway = match trimmed(get("PROMETHEUS_GATEWAY")) {
            Some(raw) => {
                Url::parse(&raw).map_err(|source| ConfigError::InvalidGateway {
                    value: raw.clone(),
                    source,
                })?;
                Some(raw)
            }
            None => None,
        };

        let metric_key = trimmed(get("PROMETHEUS_KEY"));
        let instance = trimmed(get("METER_INSTANCE")).unwrap_or_else(hostname);

        Ok(Self {
            interval,
            gateway,
            metric_key,
            instance,
        })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Best-effort hostname for the instance label.
fn hostname() -> String {
    if let Some(name) = trimmed(env::var("HOSTNAME").ok()) {
        return name;
    }
    if let Some(name) = trimmed(fs::read_to_string("/etc/hostname").ok()) {
        return name;
    }
    "localhost".to_string()
}
