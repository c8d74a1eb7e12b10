//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Readiness probe attempt fails:
//!     → retries.rs (attempts left? sleep, then try again)
//!     → sleep.rs   (the only place a retry actually waits)
//! ```
//!
//! # Design Decisions
//! - Retries are local to one probe; the overall deadline lives in the evaluator
//! - The sleep primitive is injectable so retry timing is testable without waiting

pub mod retries;
pub mod sleep;

pub use retries::RetryPolicy;
pub use sleep::{RecordingSleeper, Sleeper, TokioSleeper};
