//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Evaluators and adapters produce:
//!     → logging.rs (structured log events via `tracing`)
//!
//! Consumers:
//!     → the sidecar binary's fmt subscriber (stdout, pretty or JSON)
//!     → or a `Dispatch` injected by the embedding application
//! ```

pub mod logging;

pub use logging::init_logging;
