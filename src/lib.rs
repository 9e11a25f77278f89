//! Push-based process metering.
//!
//! Counters and gauges live in a [`MeterRegistry`]; a background task wakes
//! on a fixed interval, logs one rate line per counter and pushes per-second
//! rates to an optional Prometheus push gateway. The registry only ever
//! sends data out. It serves no scrape endpoint and accepts no inbound
//! connections.

pub mod config;
pub mod counter;
pub mod gateway;
pub mod periodic;
pub mod rate;
pub mod registry;

pub use config::{ConfigError, MeterConfig};
pub use counter::SafeCounter;
pub use gateway::GatewayClient;
pub use periodic::PeriodicTask;
pub use rate::format_rate;
pub use registry::{GaugeFn, MeterRegistry};
