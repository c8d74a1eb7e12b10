//! Health and readiness sidecar library.
//!
//! Two independent evaluators answer the orchestrator's probes:
//! - [`health`]: an error-rate listener that latches unhealthy once too many
//!   errors arrive within a window
//! - [`readiness`]: concurrent, retried probes aggregated under one deadline
//!
//! [`http`] and [`grpc`] translate their verdicts into protocol responses.

pub mod config;
pub mod grpc;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod probes;
pub mod readiness;
pub mod resilience;

pub use config::SidecarConfig;
pub use health::{ErrorRateMonitor, ErrorReporter, HealthCheck, HealthStatus};
pub use lifecycle::Shutdown;
pub use readiness::{Probe, ReadinessCheck, ReadinessError, ReadinessEvaluator};

/// Error type accepted from applications and probes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
