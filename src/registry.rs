//! Named meters with periodic rate reporting.
//!
//! A [`MeterRegistry`] owns a set of counters and gauges plus one background
//! reporting task. Producers call [`MeterRegistry::mark`] from any thread on
//! the hot path; every interval the reporter takes per-counter deltas, logs
//! one aligned line per counter (delta, rate, total, average) and pushes the
//! per-second rate to an optional Prometheus push gateway. Reporting is
//! push-only: nothing here listens on a socket or serves scrapes.

use crate::config::MeterConfig;
use crate::counter::SafeCounter;
use crate::gateway::GatewayClient;
use crate::periodic::PeriodicTask;
use crate::rate::format_rate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{info, warn};

/// A gauge producer. Returns `Ok(Some(value))` to report a sample,
/// `Ok(None)` to skip this cycle, `Err` when sampling failed.
pub type GaugeFn = dyn Fn() -> anyhow::Result<Option<f64>> + Send + Sync;

/// Registry of named counters and gauges with a periodic reporter.
pub struct MeterRegistry {
    inner: Arc<RegistryInner>,
    reporter: PeriodicTask,
}

struct RegistryInner {
    counters: RwLock<HashMap<String, Arc<SafeCounter>>>,
    gauges: RwLock<HashMap<String, Arc<GaugeFn>>>,
    cycles: AtomicU64,
    interval: Duration,
    gateway: GatewayClient,
}

impl MeterRegistry {
    pub fn new(config: MeterConfig) -> Self {
        let gateway = GatewayClient::new(&config);
        Self {
            inner: Arc::new(RegistryInner {
                counters: RwLock::new(HashMap::new()),
                gauges: RwLock::new(HashMap::new()),
                cycles: AtomicU64::new(0),
                interval: config.interval,
                gateway,
            }),
            reporter: PeriodicTask::new("meter-report", config.interval),
        }
    }

    /// Count one event under `key`, creating the counter on first use.
    ///
    /// Synchronous and lock-light so call sites never need to care whether
    /// the reporter is running.
    pub fn mark(&self, key: &str) {
        self.inner.counter(key).increment();
    }

    /// Current total for `key`, `None` if nothing was ever marked under it.
    pub fn total(&self, key: &str) -> Option<u64> {
        self.inner
            .read_counters()
            .get(key)
            .map(|counter| counter.get())
    }

    /// Register a gauge sampled once per report cycle. With `overwrite` set
    /// an existing producer under the same key is replaced, otherwise the
    /// first registration wins.
    pub fn register_gauge<F>(&self, key: &str, producer: F, overwrite: bool)
    where
        F: Fn() -> anyhow::Result<Option<f64>> + Send + Sync + 'static,
    {
        let mut gauges = self.inner.write_gauges();
        if !overwrite && gauges.contains_key(key) {
            return;
        }
        gauges.insert(key.to_string(), Arc::new(producer));
    }

    /// Start the reporting loop, clearing all counters and the cycle count
    /// first. Returns `&self` so construction can chain into `start()`.
    /// No-op when already running.
    pub fn start(&self) -> &Self {
        if self.reporter.is_running() {
            return self;
        }

        self.reset();
        let inner = Arc::clone(&self.inner);
        self.reporter.start(move || {
            let inner = Arc::clone(&inner);
            async move { inner.report_cycle().await }
        });
        self
    }

    /// Stop the reporting loop, waiting for an in-flight cycle to finish.
    /// Counters keep accumulating while stopped.
    pub async fn stop(&self) {
        self.reporter.stop().await;
    }

    pub fn is_running(&self) -> bool {
        self.reporter.is_running()
    }

    /// Drop all counters and zero the cycle count. Gauges stay registered.
    pub fn reset(&self) {
        self.inner.write_counters().clear();
        self.inner.cycles.store(0, Ordering::Relaxed);
    }

    /// Stop reporting and delete every counter's series group from the
    /// gateway. Meant for process exit.
    pub async fn shutdown(&self) {
        self.stop().await;
        for key in self.inner.counter_keys() {
            self.inner.gateway.delete(&key).await;
        }
    }
}

impl Default for MeterRegistry {
    fn default() -> Self {
        Self::new(MeterConfig::default())
    }
}

impl RegistryInner {
    fn counter(&self, key: &str) -> Arc<SafeCounter> {
        if let Some(counter) = self.read_counters().get(key) {
            return Arc::clone(counter);
        }
        let mut counters = self.write_counters();
        Arc::clone(counters.entry(key.to_string()).or_default())
    }

    fn counter_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read_counters().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// One report cycle: bump the cycle count, then counters, then gauges.
    async fn report_cycle(&self) -> anyhow::Result<()> {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        self.report_counters(cycle).await;
        self.report_gauges();
        Ok(())
    }

    async fn report_counters(&self, cycle: u64) {
        let lines = self.collect_counter_lines(cycle);
        if lines.is_empty() {
            return;
        }

        let tag_width = lines.iter().map(|line| line.key.len()).max().unwrap_or(0) + 8;
        for line in &lines {
            info!("{}", line.render(tag_width));
            self.gateway.push(&line.key, line.per_second).await;
        }
    }

    /// Snapshot every counter into a report line, consuming each counter's
    /// delta window. Lines come out sorted by key so log output is stable.
    fn collect_counter_lines(&self, cycle: u64) -> Vec<ReportLine> {
        let mut counters: Vec<(String, Arc<SafeCounter>)> = self
            .read_counters()
            .iter()
            .map(|(key, counter)| (key.clone(), Arc::clone(counter)))
            .collect();
        counters.sort_by(|a, b| a.0.cmp(&b.0));

        let interval_secs = self.interval.as_secs_f64();
        counters
            .into_iter()
            .map(|(key, counter)| {
                let delta = counter.delta();
                let total = counter.get();
                let per_second = if interval_secs > 0.0 {
                    delta as f64 / interval_secs
                } else {
                    0.0
                };
                ReportLine {
                    rate: format_rate(delta, interval_secs),
                    avg_rate: format_rate(total, interval_secs * cycle as f64),
                    key,
                    delta,
                    total,
                    per_second,
                }
            })
            .collect()
    }

    fn report_gauges(&self) {
        for (key, value) in self.sample_gauges() {
            info!("[{}] gauge: {}", key, value);
        }
    }

    /// Invoke every gauge producer and collect the successful samples. The
    /// gauge map lock is released before any producer runs, so producers may
    /// register further gauges without deadlocking. One failing producer
    /// only loses its own sample.
    fn sample_gauges(&self) -> Vec<(String, f64)> {
        let mut producers: Vec<(String, Arc<GaugeFn>)> = self
            .read_gauges()
            .iter()
            .map(|(key, producer)| (key.clone(), Arc::clone(producer)))
            .collect();
        producers.sort_by(|a, b| a.0.cmp(&b.0));

        let mut samples = Vec::with_capacity(producers.len());
        for (key, producer) in producers {
            match producer() {
                Ok(Some(value)) => samples.push((key, value)),
                Ok(None) => {}
                Err(err) => warn!("[{}] gauge failed: {:#}", key, err),
            }
        }
        samples
    }

    fn read_counters(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<SafeCounter>>> {
        self.counters.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_counters(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<SafeCounter>>> {
        self.counters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_gauges(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<GaugeFn>>> {
        self.gauges.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_gauges(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<GaugeFn>>> {
        self.gauges.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One per-counter line of a report cycle.
struct ReportLine {
    key: String,
    delta: u64,
    total: u64,
    rate: String,
    avg_rate: String,
    per_second: f64,
}

impl ReportLine {
    /// Render in the fixed-column report format. `tag_width` pads the
    /// `[meter-key]` tag so columns line up across counters.
    fn render(&self, tag_width: usize) -> String {
        let tag = format!("[meter-{}]", self.key);
        format!(
            "{:<tag_width$} count: {:>5}, rate: {}; total: {:>8}, avg: {}",
            tag, self.delta, self.rate, self.total, self.avg_rate
        )
    }
}
