use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

/// A cancellable background task that invokes a callback on a fixed interval.
///
/// The first invocation happens only after a full interval has elapsed, never
/// immediately on start. A failing callback is logged and the schedule keeps
/// going; only [`PeriodicTask::stop`] ends it. If an invocation overruns its
/// interval the missed ticks are skipped instead of bursting.
pub struct PeriodicTask {
    name: String,
    interval: Duration,
    running: Mutex<Option<RunningTask>>,
}

struct RunningTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            running: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the timer loop. Ignored with a warning if the task is already
    /// running. Must be called from within a Tokio runtime.
    pub fn start<F, Fut>(&self, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send,
    {
        let mut running = self.lock_running();
        if running.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            warn!("PeriodicTask [{}]: already running, start ignored", self.name);
            return;
        }

        let (cancel, mut cancelled) = watch::channel(false);
        let name = self.name.clone();
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    // Fires on stop() and when the owner is dropped without
                    // stopping, which closes the channel.
                    _ = cancelled.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = tick().await {
                            error!("PeriodicTask [{}]: cycle failed: {:#}", name, err);
                        }
                    }
                }
            }
        });

        info!(
            "PeriodicTask [{}]: started (interval: {:?})",
            self.name, self.interval
        );
        *running = Some(RunningTask { cancel, handle });
    }

    /// Request cancellation and wait for the loop to wind down. An in-flight
    /// callback finishes before this returns. Idempotent.
    pub async fn stop(&self) {
        let Some(task) = self.lock_running().take() else {
            return;
        };
        let _ = task.cancel.send(true);
        let _ = task.handle.await;
        info!("PeriodicTask [{}]: stopped", self.name);
    }

    pub fn is_running(&self) -> bool {
        self.lock_running()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<RunningTask>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
