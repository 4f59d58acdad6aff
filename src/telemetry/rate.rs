//! Windowed rate aggregation
//!
//! Work is counted into the lifecycle record's rate window as it happens. Once
//! per period the aggregator closes the window, divides the count by the
//! window length and publishes the result as the `predictions_per_second`
//! gauge.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::metrics::SharedMetrics;
use crate::lifecycle::LifecycleState;

/// How often the gauge is republished
pub const RATE_PERIOD: Duration = Duration::from_secs(1);

/// Lower bound on the window length, so a zero-length window cannot divide by zero
pub const MIN_WINDOW_SECS: f64 = 1e-6;

pub struct RateAggregator {
    state: Arc<LifecycleState>,
    metrics: SharedMetrics,
    period: Duration,
}

impl RateAggregator {
    pub fn new(state: Arc<LifecycleState>, metrics: SharedMetrics) -> Self {
        Self {
            state,
            metrics,
            period: RATE_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Close the current window at `now` and publish its rate.
    ///
    /// Returns the published rate.
    pub fn tick(&self, now: Instant) -> f64 {
        let (count, started_at) = self.state.take_rate_window(now);
        let elapsed = now
            .saturating_duration_since(started_at)
            .as_secs_f64()
            .max(MIN_WINDOW_SECS);
        let rate = count as f64 / elapsed;

        self.metrics.set_predictions_per_second(rate);
        rate
    }

    /// Tick every period until `cancel` fires.
    ///
    /// Cancellation is checked before every publication, so no gauge update
    /// happens after the token is cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        info!(period_ms = self.period.as_millis() as u64, "Rate aggregator started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.period) => {
                    let rate = self.tick(Instant::now());
                    debug!(rate, "Published prediction rate");
                }
            }
        }

        info!("Rate aggregator stopped");
    }

    /// Spawn [`run`](Self::run) onto the runtime
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
