//! HTTP transport adapter.
//!
//! # Data Flow
//! ```text
//! Orchestrator probe (GET /healthz | /readyz)
//!     → server.rs (Axum router, request tracing)
//!     → handlers.rs (ask the evaluator, map verdict to status code)
//!     → 200 | 500 + reason text
//! ```

pub mod handlers;
pub mod server;

pub use server::{AppState, ProbeServer, ServerError};
