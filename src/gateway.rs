//! Prometheus push gateway client.
//!
//! Delivery is best-effort: pushes that fail are logged and dropped, never
//! retried, and never surface to the reporting loop. A down gateway must not
//! break local metering.

use crate::config::MeterConfig;
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

/// Request timeout for every gateway call.
const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for a Prometheus push gateway.
///
/// Built from a [`MeterConfig`]; stays disabled (every call a no-op) unless
/// both the gateway URL and the metric key are configured.
#[derive(Debug)]
pub struct GatewayClient {
    client: Client,
    target: Option<Target>,
}

#[derive(Debug)]
struct Target {
    base: String,
    metric: String,
    instance: String,
}

impl GatewayClient {
    pub fn new(config: &MeterConfig) -> Self {
        let client = Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        let target = match (&config.gateway, &config.metric_key) {
            (Some(gateway), Some(metric)) => Some(Target {
                base: gateway.trim_end_matches('/').to_string(),
                metric: metric.clone(),
                instance: config.instance.clone(),
            }),
            _ => None,
        };

        Self { client, target }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Push one per-second rate sample for `job`. Failures are logged at warn
    /// level and swallowed.
    pub async fn push(&self, job: &str, value: f64) {
        let Some(target) = &self.target else {
            return;
        };

        let url = job_url(target, job);
        let body = exposition(&target.metric, value);
        match self.client.put(&url).body(body).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!(
                    "GatewayClient: push for {} returned {}",
                    job,
                    response.status()
                );
            }
            Ok(_) => {}
            Err(err) => {
                warn!("GatewayClient: push for {} failed: {}", job, err);
            }
        }
    }

    /// Remove the series group for `job` from the gateway. Failures are
    /// logged at warn level and swallowed.
    pub async fn delete(&self, job: &str) {
        let Some(target) = &self.target else {
            return;
        };

        info!("[meter-{}] removing from gateway", job);
        let url = job_url(target, job);
        match self.client.delete(&url).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!(
                    "GatewayClient: delete for {} returned {}",
                    job,
                    response.status()
                );
            }
            Ok(_) => {}
            Err(err) => {
                warn!("GatewayClient: delete for {} failed: {}", job, err);
            }
        }
    }
}

fn job_url(target: &Target, job: &str) -> String {
    format!(
        "{}/metrics/job/{}/instance/{}",
        target.base, job, target.instance
    )
}

/// Prometheus text exposition for a single gauge sample.
fn exposition(metric: &str, value: f64) -> String {
    format!("# TYPE {metric} gauge\n{metric} {value}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_config(gateway: &str) -> MeterConfig {
        MeterConfig {
            interval: Duration::from_secs(15),
            gateway: Some(gateway.to_string()),
            metric_key: Some("job_rate".to_string()),
            instance: "host-1".to_string(),
        }
    }

    #[test]
    fn test_job_url_shape() {
        let target = Target {
            base: "http://pushgw:9091".to_string(),
            metric: "job_rate".to_string(),
            instance: "host-1".to_string(),
        };
        assert_eq!(
            job_url(&target, "ingest"),
            "http://pushgw:9091/metrics/job/ingest/instance/host-1"
        );
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = GatewayClient::new(&enabled_config("http://pushgw:9091/"));
        let target = client.target.as_ref().unwrap();
        assert_eq!(target.base, "http://pushgw:9091");
    }

    #[test]
    fn test_exposition_payload() {
        assert_eq!(
            exposition("job_rate", 35.0),
            "# TYPE job_rate gauge\njob_rate 35\n"
        );
        assert_eq!(
            exposition("job_rate", 0.5),
            "# TYPE job_rate gauge\njob_rate 0.5\n"
        );
    }

    #[test]
    fn test_disabled_without_gateway_or_key() {
        let no_gateway = MeterConfig {
            interval: Duration::from_secs(15),
            gateway: None,
            metric_key: Some("job_rate".to_string()),
            instance: "host-1".to_string(),
        };
        assert!(!GatewayClient::new(&no_gateway).is_enabled());

        let no_key = MeterConfig {
            interval: Duration::from_secs(15),
            gateway: Some("http://pushgw:9091".to_string()),
            metric_key: None,
            instance: "host-1".to_string(),
        };
        assert!(!GatewayClient::new(&no_key).is_enabled());

        assert!(GatewayClient::new(&enabled_config("http://pushgw:9091")).is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_client_skips_requests() {
        let client = GatewayClient::new(&MeterConfig {
            interval: Duration::from_secs(15),
            gateway: None,
            metric_key: None,
            instance: "host-1".to_string(),
        });
        // Nothing to connect to; must return without attempting a request.
        client.push("ingest", 1.0).await;
        client.delete("ingest").await;
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_swallowed() {
        // Discard port, nothing listens there; both calls must swallow the
        // connection error.
        let client = GatewayClient::new(&enabled_config("http://127.0.0.1:9"));
        client.push("ingest", 1.0).await;
        client.delete("ingest").await;
    }
}
