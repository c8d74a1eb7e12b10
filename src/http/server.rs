//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the configured probe endpoints
//! - Wire up request tracing
//! - Serve until shutdown is signalled

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::health::HealthCheck;
use crate::http::handlers;
use crate::lifecycle::shutdown;
use crate::readiness::ReadinessCheck;

/// Error type for the HTTP adapter.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("neither ready nor health logic was initialised")]
    NothingToServe,

    #[error("HTTP server failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Readiness checker plus the per-request deadline.
#[derive(Clone)]
pub struct ReadinessRoute {
    pub checker: Arc<dyn ReadinessCheck>,
    pub timeout: Duration,
}

/// Application state injected into handlers.
#[derive(Clone, Default)]
pub struct AppState {
    pub health: Option<Arc<dyn HealthCheck>>,
    pub readiness: Option<ReadinessRoute>,
}

/// HTTP adapter serving `/healthz`, `/readyz` and `/status`.
#[derive(Clone, Default)]
pub struct ProbeServer {
    state: AppState,
}

impl ProbeServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `/healthz` from `checker`.
    pub fn with_health(mut self, checker: Arc<dyn HealthCheck>) -> Self {
        self.state.health = Some(checker);
        self
    }

    /// Serve `/readyz` from `checker`, each request bounded by `timeout`.
    pub fn with_readiness(mut self, checker: Arc<dyn ReadinessCheck>, timeout: Duration) -> Self {
        self.state.readiness = Some(ReadinessRoute { checker, timeout });
        self
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Result<Router, ServerError> {
        if self.state.health.is_none() && self.state.readiness.is_none() {
            return Err(ServerError::NothingToServe);
        }

        let mut router = Router::new().route("/status", get(handlers::status));
        if self.state.health.is_some() {
            tracing::info!("Will serve health checks at /healthz");
            router = router.route("/healthz", get(handlers::healthz));
        }
        if self.state.readiness.is_some() {
            tracing::info!("Will serve readiness checks at /readyz");
            router = router.route("/readyz", get(handlers::readyz));
        }

        Ok(router
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http()))
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), ServerError> {
        let app = self.router()?;
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Starting health/ready HTTP server");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }
}
