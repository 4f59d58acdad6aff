//! Graceful shutdown handling
//!
//! Handles SIGTERM and SIGINT signals for clean shutdown:
//! - Marks the service not ready and shutting down immediately
//! - Stops the HTTP server from accepting new connections
//! - Hands over to the drain sequence once the server loop ends

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::lifecycle::{DrainOutcome, DrainReport, DrainSequencer, LifecycleState};

/// Shutdown signal receiver
///
/// Cloned and passed to components that need to stop when shutdown begins.
#[derive(Clone)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    /// Check if shutdown was signaled (non-blocking)
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A token cancelled together with this signal
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

/// Controller for triggering shutdown
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    /// Trigger shutdown. Safe to call more than once.
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            self.token.cancel();
            info!("Shutdown signal sent");
        }
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Cloned and passed to components that need to listen
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let token = CancellationToken::new();
    (
        ShutdownController {
            token: token.clone(),
        },
        ShutdownSignal { token },
    )
}

/// Registered SIGTERM and SIGINT handlers
///
/// Registering before waiting means a signal delivered in between is not lost.
#[cfg(unix)]
pub struct TerminationSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    pub fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for the next signal and return its name
    pub async fn recv(&mut self) -> io::Result<&'static str> {
        let name = tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        };
        info!(signal = name, "Received signal");
        Ok(name)
    }
}

/// Ctrl+C handler (Windows)
#[cfg(not(unix))]
pub struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn register() -> io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(&mut self) -> io::Result<&'static str> {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
        Ok("CTRL_C")
    }
}

/// Wait for SIGTERM or SIGINT (Ctrl+C on Windows)
///
/// Returns the signal name that was received, or an error if the handlers
/// could not be registered.
pub async fn wait_for_signal() -> io::Result<&'static str> {
    TerminationSignals::register()?.recv().await
}

/// Flip the lifecycle flags and trigger shutdown once a termination signal
/// arrives.
///
/// Handlers are registered before this returns. The flags change before
/// anything else happens so readiness probes fail over as early as possible.
pub fn spawn_signal_listener(
    lifecycle: Arc<LifecycleState>,
    controller: ShutdownController,
) -> io::Result<JoinHandle<()>> {
    let mut signals = TerminationSignals::register()?;

    Ok(tokio::spawn(async move {
        match signals.recv().await {
            Ok(signal) => {
                lifecycle.mark_shutting_down();
                info!(signal, "Marked not ready, initiating graceful shutdown");
                controller.shutdown();
            }
            Err(e) => {
                error!(error = %e, "Failed to wait for termination signal");
            }
        }
    }))
}

/// Serve until shutdown is signalled or the server task ends on its own,
/// then run the drain sequence.
///
/// Returns `None` if a drain was already started elsewhere.
pub async fn serve_until_shutdown(
    server: &mut JoinHandle<io::Result<()>>,
    signal: &ShutdownSignal,
    lifecycle: &LifecycleState,
    drain: &DrainSequencer,
    grace: Duration,
) -> Option<DrainReport> {
    tokio::select! {
        result = &mut *server => {
            match result {
                Ok(Ok(())) => warn!("HTTP server stopped unexpectedly"),
                Ok(Err(e)) => error!(error = %e, "HTTP server failed"),
                Err(e) => error!(error = %e, "HTTP server task panicked"),
            }
            lifecycle.mark_shutting_down();
        }
        _ = signal.wait() => {
            info!("Initiating graceful shutdown");
        }
    }

    let report = drain.begin_drain(grace).await?;
    if let DrainOutcome::TimedOut { remaining } = report.outcome {
        warn!(remaining, "Shutting down with requests still in flight");
    }
    if !report.failed_releases.is_empty() {
        warn!(failed = ?report.failed_releases, "Some resources failed to release");
    }
    Some(report)
}
