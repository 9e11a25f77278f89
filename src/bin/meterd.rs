//! Pushmeter agent - Standalone metering demo
//!
//! This binary runs a meter registry with a synthetic workload, suitable for
//! checking a push gateway wiring end to end. Report lines go to stdout.
//!
//! # Usage
//! ```sh
//! METER_INTERVAL_SECS=5 cargo run --bin meterd
//! ```
//!
//! # Environment Variables
//! - `METER_INTERVAL_SECS` - Interval in seconds between report cycles (default: 15)
//! - `PROMETHEUS_GATEWAY` - Push gateway base URL (optional)
//! - `PROMETHEUS_KEY` - Metric name for pushed samples (optional)
//! - `METER_INSTANCE` - Instance label override (optional)

use anyhow::Result;
use pushmeter::{MeterConfig, MeterRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("Pushmeter agent {} starting...", env!("CARGO_PKG_VERSION"));

    let config = MeterConfig::from_env()?;
    info!(
        "Configuration loaded: interval={:?}, gateway={}, instance={}",
        config.interval,
        config.gateway.as_deref().unwrap_or("disabled"),
        config.instance
    );

    let registry = Arc::new(MeterRegistry::new(config));
    registry.start();

    let started = Instant::now();
    registry.register_gauge(
        "uptime-seconds",
        move || Ok(Some(started.elapsed().as_secs_f64())),
        true,
    );

    // Synthetic workload so a fresh deployment has meters to look at.
    let heartbeat = Arc::clone(&registry);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        loop {
            ticker.tick().await;
            heartbeat.mark("heartbeat");
        }
    });

    info!("Agent running. Press Ctrl+C to shutdown.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting...");
    registry.shutdown().await;

    Ok(())
}
