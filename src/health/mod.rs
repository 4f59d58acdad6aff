//! Dependency health checks
//!
//! Each downstream dependency is wrapped in a [`DependencyCheck`]; the
//! [`HealthCoordinator`] runs all of them with retries and folds the results
//! into a single readiness verdict.

mod coordinator;

pub use coordinator::{
    DependencyCheck, HealthCoordinator, Probe, ProbeError, ProbeResult, ReadinessVerdict,
    RetryPolicy, DEFAULT_ATTEMPT_TIMEOUT,
};

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod coordinator_tests;
