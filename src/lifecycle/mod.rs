//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger()
//!
//! Shutdown (shutdown.rs):
//!     trigger() → every subscribed loop observes the broadcast
//!               → error listener stops consuming
//!               → HTTP / gRPC servers drain and exit
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the signal out to every long-running task
//! - Loops select on the shutdown receiver so they exit even when idle

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
