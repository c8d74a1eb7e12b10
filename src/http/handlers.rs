//! Probe endpoint handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::time::Instant;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct SidecarStatus {
    pub version: &'static str,
    /// `None` when health checking is not configured.
    pub healthy: Option<bool>,
    pub reason: String,
}

/// `GET /healthz`: 200 when healthy, 500 with the reason otherwise.
pub async fn healthz(State(state): State<AppState>) -> Response {
    let Some(health) = state.health.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let status = health.is_healthy();
    if status.is_healthy() {
        return StatusCode::OK.into_response();
    }

    tracing::warn!(reason = status.reason(), "Health check failure");
    (StatusCode::INTERNAL_SERVER_ERROR, status.reason().to_string()).into_response()
}

/// `GET /readyz`: runs the probes under the configured timeout.
pub async fn readyz(State(state): State<AppState>) -> Response {
    let Some(readiness) = state.readiness.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let deadline = Instant::now() + readiness.timeout;
    match readiness.checker.is_ready(deadline).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Ready check failure");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// `GET /status`: health verdict as JSON. Does not run readiness probes.
pub async fn status(State(state): State<AppState>) -> Json<SidecarStatus> {
    let verdict = state.health.as_ref().map(|h| h.is_healthy());
    Json(SidecarStatus {
        version: env!("CARGO_PKG_VERSION"),
        healthy: verdict.as_ref().map(|v| v.is_healthy()),
        reason: verdict.map(|v| v.reason().to_string()).unwrap_or_default(),
    })
}
