use std::sync::{Mutex, MutexGuard, PoisonError};

/// Thread-safe monotonic event counter.
///
/// Tracks the running total plus the value it had at the last report, so the
/// reporting path can take per-interval deltas without a second bookkeeping
/// structure. All operations take the counter's own lock briefly; contention
/// is per-counter, never global.
#[derive(Debug, Default)]
pub struct SafeCounter {
    state: Mutex<CounterState>,
}

#[derive(Debug, Default, Clone, Copy)]
struct CounterState {
    count: u64,
    prev: u64,
}

impl SafeCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one event. Visible to every thread once the call returns.
    pub fn increment(&self) {
        self.lock().count += 1;
    }

    /// Current total since creation or the last [`SafeCounter::reset`].
    pub fn get(&self) -> u64 {
        self.lock().count
    }

    /// Events accumulated since the previous `delta` call, consuming the
    /// window.
    ///
    /// Crate-private on purpose: concurrent callers would race on which
    /// since-last-report window the result covers, so only the reporting
    /// path takes deltas.
    pub(crate) fn delta(&self) -> u64 {
        let mut state = self.lock();
        let delta = state.count - state.prev;
        state.prev = state.count;
        delta
    }

    /// Zero the counter and its delta window.
    pub fn reset(&self) {
        *self.lock() = CounterState::default();
    }

    fn lock(&self) -> MutexGuard<'_, CounterState> {
        // Counter state is a pair of integers and stays valid even if a
        // panicking thread held the lock.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
