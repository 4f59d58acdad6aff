//! Readiness aggregation over dependency probes

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::lifecycle::LifecycleState;

/// Default upper bound for a single probe attempt
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(1500);

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("database check failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache check failed: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("{0}")]
    Other(String),
}

/// A minimal round-trip to one downstream dependency
#[async_trait]
pub trait Probe: Send + Sync {
    async fn ping(&self) -> Result<(), ProbeError>;
}

/// Outcome of checking one dependency, e.g. `{healthy: true, label: "db:ok"}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub healthy: bool,
    pub label: String,
}

/// Retry schedule applied to every configured probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub attempt_timeout: Duration,
    pub pause: Duration,
}

impl RetryPolicy {
    pub fn with_attempt_timeout(attempt_timeout: Duration) -> Self {
        Self {
            attempt_timeout,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            pause: Duration::from_millis(300),
        }
    }
}

/// A named dependency, possibly not configured in this deployment
#[derive(Clone)]
pub struct DependencyCheck {
    name: String,
    probe: Option<Arc<dyn Probe>>,
}

impl DependencyCheck {
    pub fn configured(name: impl Into<String>, probe: Arc<dyn Probe>) -> Self {
        Self {
            name: name.into(),
            probe: Some(probe),
        }
    }

    /// A dependency this deployment does not use; always healthy
    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probe: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the probe under `policy`, swallowing errors into a result
    pub async fn run(&self, policy: &RetryPolicy) -> ProbeResult {
        let Some(probe) = &self.probe else {
            return self.result(true, "disabled");
        };

        let attempts = policy.attempts.max(1);
        for attempt in 1..=attempts {
            let outcome = match tokio::time::timeout(policy.attempt_timeout, probe.ping()).await {
                Ok(result) => result,
                Err(_) => Err(ProbeError::Timeout(policy.attempt_timeout)),
            };

            match outcome {
                Ok(()) => return self.result(true, "ok"),
                Err(e) if attempt < attempts => {
                    debug!(dependency = %self.name, attempt, error = %e, "Probe attempt failed, retrying");
                    tokio::time::sleep(policy.pause).await;
                }
                Err(e) => {
                    warn!(dependency = %self.name, attempts, error = %e, "Dependency unhealthy");
                }
            }
        }

        self.result(false, "fail")
    }

    fn result(&self, healthy: bool, status: &str) -> ProbeResult {
        ProbeResult {
            healthy,
            label: format!("{}:{}", self.name, status),
        }
    }
}

/// Readiness answer for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessVerdict {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl ReadinessVerdict {
    fn draining() -> Self {
        Self {
            ready: false,
            reason: Some("draining"),
        }
    }
}

pub struct HealthCoordinator {
    state: Arc<LifecycleState>,
    checks: Vec<DependencyCheck>,
    policy: RetryPolicy,
}

impl HealthCoordinator {
    pub fn new(state: Arc<LifecycleState>, checks: Vec<DependencyCheck>, policy: RetryPolicy) -> Self {
        Self {
            state,
            checks,
            policy,
        }
    }

    /// Decide whether the service should receive new traffic.
    ///
    /// Draining wins over dependency health: once the lifecycle record is
    /// not ready, no probe is invoked.
    pub async fn check_readiness(&self) -> ReadinessVerdict {
        if !self.state.is_ready() {
            return ReadinessVerdict::draining();
        }

        let results = join_all(self.checks.iter().map(|check| check.run(&self.policy))).await;
        let ready = results.iter().all(|r| r.healthy);
        if !ready {
            let labels: Vec<&str> = results.iter().map(|r| r.label.as_str()).collect();
            warn!(checks = ?labels, "Not ready");
        }

        ReadinessVerdict {
            ready,
            reason: None,
        }
    }
}
