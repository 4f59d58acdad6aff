//! Drain sequencing
//!
//! Shutdown runs in a fixed order:
//! 1. Stop advertising readiness
//! 2. Wait for in-flight requests to finish, bounded by a grace period
//! 3. Cancel background tasks (the rate aggregator)
//! 4. Release held resources in registration order
//!
//! Each release is independent: a failing release is logged and the
//! remaining resources are still released.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::state::LifecycleState;

/// Interval between in-flight checks while draining
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("release of {resource} failed: {reason}")]
    Failed {
        resource: &'static str,
        reason: String,
    },
}

/// A resource held for the process lifetime and released during drain
#[async_trait]
pub trait Releasable: Send + Sync {
    /// Short name used in logs (e.g. "http_client")
    fn name(&self) -> &'static str;

    async fn release(&self) -> Result<(), ReleaseError>;
}

/// How the in-flight wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// All in-flight requests finished before the deadline
    Drained,
    /// The grace period elapsed with requests still in flight
    TimedOut { remaining: u64 },
}

#[derive(Debug)]
pub struct DrainReport {
    pub outcome: DrainOutcome,
    pub waited: Duration,
    /// Names of resources whose release failed, in release order
    pub failed_releases: Vec<&'static str>,
}

pub struct DrainSequencer {
    state: Arc<LifecycleState>,
    background: CancellationToken,
    resources: Vec<Arc<dyn Releasable>>,
    poll_interval: Duration,
    started: AtomicBool,
}

impl DrainSequencer {
    /// Create a sequencer for `state`.
    ///
    /// `background` is cancelled once the in-flight wait is over; background
    /// tasks should hold a child of it. `resources` are released in the
    /// given order.
    pub fn new(
        state: Arc<LifecycleState>,
        background: CancellationToken,
        resources: Vec<Arc<dyn Releasable>>,
    ) -> Self {
        Self {
            state,
            background,
            resources,
            poll_interval: DRAIN_POLL_INTERVAL,
            started: AtomicBool::new(false),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Whether `begin_drain` has been invoked
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Run the full drain sequence.
    ///
    /// Only the first call does anything; later calls return `None`
    /// immediately.
    pub async fn begin_drain(&self, grace: Duration) -> Option<DrainReport> {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Drain already in progress, ignoring");
            return None;
        }

        self.state.mark_not_ready();
        info!(
            active_requests = self.state.active_requests(),
            grace_secs = grace.as_secs_f64(),
            "Drain started, waiting for active requests"
        );

        let started_at = Instant::now();
        let outcome = self.wait_for_idle(grace).await;
        let waited = started_at.elapsed();

        match outcome {
            DrainOutcome::Drained => {
                info!(waited_ms = waited.as_millis() as u64, "Active requests drained")
            }
            DrainOutcome::TimedOut { remaining } => warn!(
                remaining,
                waited_ms = waited.as_millis() as u64,
                "Grace period elapsed with requests still in flight"
            ),
        }

        self.background.cancel();

        let failed_releases = self.release_resources().await;

        info!("Drain complete");
        Some(DrainReport {
            outcome,
            waited,
            failed_releases,
        })
    }

    async fn wait_for_idle(&self, grace: Duration) -> DrainOutcome {
        let deadline = Instant::now() + grace;

        loop {
            let active = self.state.active_requests();
            if active == 0 {
                return DrainOutcome::Drained;
            }

            let now = Instant::now();
            if now >= deadline {
                return DrainOutcome::TimedOut { remaining: active };
            }

            // Never sleep past the deadline
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn release_resources(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();

        for resource in &self.resources {
            match resource.release().await {
                Ok(()) => info!(resource = resource.name(), "Released"),
                Err(e) => {
                    warn!(resource = resource.name(), error = %e, "Release failed");
                    failed.push(resource.name());
                }
            }
        }

        failed
    }
}
