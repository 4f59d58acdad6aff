//! Process-wide lifecycle record
//!
//! Holds the readiness and shutting-down flags, the live in-flight request
//! count, and the work accumulator sampled by the rate aggregator. One
//! instance is created at startup and shared behind an `Arc`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

#[derive(Debug)]
pub struct LifecycleState {
    ready: AtomicBool,
    shutting_down: AtomicBool,
    active_requests: AtomicU64,
    rate_window_count: AtomicU64,
    rate_window_started_at: Mutex<Instant>,
}

impl LifecycleState {
    /// Create a new lifecycle record (ready, not shutting down, idle)
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            shutting_down: AtomicBool::new(false),
            active_requests: AtomicU64::new(0),
            rate_window_count: AtomicU64::new(0),
            rate_window_started_at: Mutex::new(Instant::now()),
        }
    }

    /// Create a shared lifecycle record
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Stop advertising readiness. Idempotent.
    ///
    /// Once not ready the service never becomes ready again; there is no
    /// corresponding `mark_ready`.
    pub fn mark_not_ready(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    /// Mark the process as shutting down (implies not ready)
    pub fn mark_shutting_down(&self) {
        self.mark_not_ready();
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Number of requests currently between entry and exit
    pub fn active_requests(&self) -> u64 {
        self.active_requests.load(Ordering::SeqCst)
    }

    /// Count one accepted request as in flight until the guard is dropped.
    ///
    /// The decrement happens in `Drop`, so it runs on every exit path,
    /// including panics unwinding through the request future and futures
    /// dropped mid-flight by the server.
    #[must_use = "the request stops being counted as soon as the guard is dropped"]
    pub fn track_request(self: &Arc<Self>) -> InFlightGuard {
        self.active_requests.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            state: Arc::clone(self),
        }
    }

    /// Add units of work to the current rate window
    pub fn record_work(&self, units: u64) {
        self.rate_window_count.fetch_add(units, Ordering::SeqCst);
    }

    /// Work recorded since the last window reset
    pub fn rate_window_count(&self) -> u64 {
        self.rate_window_count.load(Ordering::SeqCst)
    }

    /// Close the current rate window at `now`.
    ///
    /// Returns the work recorded in the window and its start instant, then
    /// starts a new empty window at `now`. The count is swapped atomically so
    /// an increment racing the reset lands in exactly one window.
    pub fn take_rate_window(&self, now: Instant) -> (u64, Instant) {
        let mut started_at = self
            .rate_window_started_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let count = self.rate_window_count.swap(0, Ordering::SeqCst);
        let window_start = std::mem::replace(&mut *started_at, now);
        (count, window_start)
    }

    fn release_request(&self) {
        // Never wraps below zero
        let _ = self
            .active_requests
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for one in-flight request
///
/// Created by [`LifecycleState::track_request`]; decrements the in-flight
/// count exactly once when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    state: Arc<LifecycleState>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.release_request();
    }
}
