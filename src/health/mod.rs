//! Error-rate health subsystem.
//!
//! # Data Flow
//! ```text
//! Producers (any task or thread):
//!     ErrorReporter::report(err)
//!     → channel.rs (stamp arrival time, bounded FIFO)
//!
//! Listener (one background task, listener.rs):
//!     → state.rs (window count, latch)
//!     → subscriber callback on the healthy → unhealthy transition
//!
//! Transport adapters:
//!     HealthCheck::is_healthy() → HealthStatus
//! ```
//!
//! # Design Decisions
//! - Health is a one-way latch, not a gauge recomputed on every query
//! - Queries never touch the channel, only the state lock
//! - Nil (`None`) errors are accepted and ignored

pub mod channel;
pub mod listener;
pub mod state;

pub use channel::{error_channel, ErrorEvent, ErrorReporter, ReportError};
pub use listener::{ErrorListener, ErrorRateMonitor};
pub use state::HealthStatus;

/// Callback invoked with the reason when health latches to unhealthy.
pub type UnhealthyCallback = Box<dyn Fn(&str) + Send + Sync + 'static>;

/// Health verdict source, as consumed by the transport adapters.
pub trait HealthCheck: Send + Sync {
    /// Current verdict. Never blocks on the error channel.
    fn is_healthy(&self) -> HealthStatus;

    /// Register the single unhealthy callback, replacing any previous one.
    ///
    /// The callback must not call back into the checker.
    fn subscribe(&self, callback: UnhealthyCallback);
}
