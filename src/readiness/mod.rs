//! Readiness subsystem.
//!
//! # Data Flow
//! ```text
//! Transport adapter: is_ready(now + timeout)
//!     → evaluator.rs (one task per probe)
//!         → probe.rs (user check, panics captured)
//!         → resilience::retries (fixed pause between attempts)
//!     → outcomes collected over a channel until done or deadline
//!     → Ok(()) | ReadinessError
//! ```
//!
//! # Design Decisions
//! - No background work: probes run fresh on every query
//! - A probe failure is fatal to the verdict only after its retries are spent
//! - The deadline is the only failure that is not a probe's own

pub mod evaluator;
pub mod probe;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

pub use evaluator::{ProbeOutcome, ReadinessEvaluator};
pub use probe::{Probe, ProbeCheck, ProbeError};

/// A probe that was still failing after its last attempt.
#[derive(Debug, Error)]
#[error("Readiness probe failed for {name}: {error}")]
pub struct ProbeFailure {
    pub name: String,
    pub error: ProbeError,
}

/// Why a readiness query returned not-ready.
#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("readiness probes failed due to the context timeout")]
    Timeout,

    #[error("{}", join_failures(.0))]
    ProbesFailed(Vec<ProbeFailure>),

    #[error("readiness evaluation was interrupted before every probe reported")]
    Interrupted,
}

fn join_failures(failures: &[ProbeFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Readiness verdict source, as consumed by the transport adapters.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// `Ok(())` when ready; must return no later than `deadline`.
    async fn is_ready(&self, deadline: Instant) -> Result<(), ReadinessError>;
}
