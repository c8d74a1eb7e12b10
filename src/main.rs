//! healthz sidecar.
//!
//! Serves health and readiness verdicts for a co-located service.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                  HEALTHZ                      │
//!                    │                                               │
//!   Orchestrator     │  ┌───────────┐      ┌─────────────────────┐   │
//!   ─────────────────┼─▶│   http    │─────▶│ health::            │   │
//!   /healthz /readyz │  │  adapter  │      │ ErrorRateMonitor    │◀──┼── ErrorReporter
//!                    │  └───────────┘  ┌─▶│ (latched verdict)   │   │
//!   ─────────────────┼─▶┌───────────┐  │  └─────────────────────┘   │
//!   grpc.health.v1   │  │   grpc    │──┤                            │
//!                    │  │  adapter  │  │  ┌─────────────────────┐   │
//!                    │  └───────────┘  └─▶│ readiness::         │───┼──▶ tcp / http / grpc
//!                    │                    │ ReadinessEvaluator  │   │    dependencies
//!                    │                    └─────────────────────┘   │
//!                    └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use healthz::config::{load_config, SidecarConfig};
use healthz::grpc::GrpcProbeService;
use healthz::health::{ErrorRateMonitor, HealthCheck};
use healthz::http::ProbeServer;
use healthz::lifecycle::{signals, Shutdown};
use healthz::observability::init_logging;
use healthz::readiness::{ReadinessCheck, ReadinessEvaluator};
use healthz::resilience::TokioSleeper;
use healthz::{probes, BoxError};

#[derive(Parser)]
#[command(name = "healthz")]
#[command(about = "Health and readiness sidecar", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "HEALTHZ_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => SidecarConfig::default(),
    };

    init_logging(&config.logging)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "healthz starting");
    tracing::info!(
        config = ?args.config,
        max_errors = config.health.max_errors_per_window,
        window_secs = config.health.window_secs,
        probes = config.readiness.probes.len(),
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();

    let (monitor, listener, reporter) = ErrorRateMonitor::new(&config.health);
    let listener_task = tokio::spawn(listener.run(shutdown.subscribe()));

    let probes = config.readiness.probes.iter().map(probes::from_config).collect();
    let evaluator = ReadinessEvaluator::from_config(probes, &config.readiness, Arc::new(TokioSleeper));

    let health: Arc<dyn HealthCheck> = Arc::new(monitor);
    let readiness: Arc<dyn ReadinessCheck> = Arc::new(evaluator);
    let timeout = config.readiness.timeout();

    let mut servers: JoinSet<Result<(), BoxError>> = JoinSet::new();

    if config.http.enabled {
        let tcp = TcpListener::bind(&config.http.bind_address).await?;
        let server = ProbeServer::new()
            .with_health(health.clone())
            .with_readiness(readiness.clone(), timeout);
        let rx = shutdown.subscribe();
        servers.spawn(async move { server.run(tcp, rx).await.map_err(Into::into) });
    }

    if config.grpc.enabled {
        let tcp = TcpListener::bind(&config.grpc.bind_address).await?;
        let service = GrpcProbeService::new()
            .with_health(health.clone())
            .with_readiness(readiness.clone(), timeout);
        let rx = shutdown.subscribe();
        servers.spawn(async move { service.serve(tcp, rx).await.map_err(Into::into) });
    }

    tokio::select! {
        _ = signals::wait_for_shutdown_signal() => {}
        Some(result) = servers.join_next() => match result {
            Ok(Ok(())) => tracing::error!("Server exited unexpectedly"),
            Ok(Err(e)) => tracing::error!(error = %e, "Server failed"),
            Err(e) => tracing::error!(error = %e, "Server task panicked"),
        },
    }

    tracing::info!("Shutting down");
    shutdown.trigger();
    while let Some(result) = servers.join_next().await {
        match result {
            Ok(Err(e)) => tracing::error!(error = %e, "Server failed during shutdown"),
            Err(e) => tracing::error!(error = %e, "Server task panicked"),
            Ok(Ok(())) => {}
        }
    }

    drop(reporter);
    if let Err(e) = listener_task.await {
        tracing::error!(error = %e, "Error listener task failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
