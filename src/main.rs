use envconfig::Envconfig;
use sentinel::config::Config;
use sentinel::deps::Dependencies;
use sentinel::health::{HealthCoordinator, RetryPolicy};
use sentinel::lifecycle::{DrainSequencer, LifecycleState};
use sentinel::server::{
    build_router, run_server, serve_until_shutdown, shutdown_channel, spawn_signal_listener,
    Integrations, ServerState, ServiceIdentity,
};
use sentinel::telemetry::{self, create_metrics, RateAggregator};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long to wait for the HTTP server to finish after the drain completes
const SERVER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::init_from_env()?;

    telemetry::logging::init_tracing(config.log_format);

    info!(
        env = %config.environment,
        pod_id = %config.pod_id,
        "Starting sentinel"
    );

    let lifecycle = LifecycleState::shared();

    let metrics = create_metrics()?;
    info!("Prometheus metrics registry initialized");

    let deps = Dependencies::from_config(&config)?;

    let health = Arc::new(HealthCoordinator::new(
        lifecycle.clone(),
        deps.checks(),
        RetryPolicy::with_attempt_timeout(config.dep_timeout.into()),
    ));

    // Cancelled by the drain once in-flight requests are done
    let background = CancellationToken::new();
    let rate_handle =
        RateAggregator::new(lifecycle.clone(), metrics.clone()).spawn(background.child_token());

    let drain = DrainSequencer::new(lifecycle.clone(), background, deps.releasables());

    let (shutdown_controller, shutdown_signal) = shutdown_channel();
    let signal_handle = spawn_signal_listener(lifecycle.clone(), shutdown_controller)?;

    let state = ServerState::new(lifecycle.clone(), health, metrics)
        .with_metrics_token(config.metrics_token())
        .with_prestop_delay(config.prestop_delay.into())
        .with_identity(ServiceIdentity {
            environment: config.environment.clone(),
            pod_id: config.pod_id.clone(),
        });

    let integrations = Integrations::from_config(&config);
    info!(enabled = ?integrations.enabled(), "Optional integrations");
    let router = integrations.apply(build_router(state));

    let listener = tokio::net::TcpListener::bind(config.bind()).await?;
    let mut server_handle = tokio::spawn(run_server(listener, router, shutdown_signal.clone()));

    // Run until a termination signal arrives or the server dies on its own
    serve_until_shutdown(
        &mut server_handle,
        &shutdown_signal,
        &lifecycle,
        &drain,
        config.shutdown_grace.into(),
    )
    .await;

    if !server_handle.is_finished()
        && tokio::time::timeout(SERVER_STOP_TIMEOUT, &mut server_handle)
            .await
            .is_err()
    {
        warn!("HTTP server did not stop in time, aborting");
        server_handle.abort();
    }
    rate_handle.abort();
    signal_handle.abort();

    info!("sentinel shut down gracefully");
    Ok(())
}
