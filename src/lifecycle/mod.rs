//! Lifecycle state and drain sequencing
//!
//! `LifecycleState` is the shared record every component reads: readiness,
//! shutdown, and in-flight accounting. `DrainSequencer` drives the ordered
//! shutdown that empties it.

mod drain;
mod state;

pub use drain::{
    DrainOutcome, DrainReport, DrainSequencer, ReleaseError, Releasable, DRAIN_POLL_INTERVAL,
};
pub use state::{InFlightGuard, LifecycleState};

#[cfg(test)]
#[path = "state_test.rs"]
mod state_tests;

#[cfg(test)]
#[path = "drain_test.rs"]
mod drain_tests;
