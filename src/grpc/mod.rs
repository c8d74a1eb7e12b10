//! gRPC transport adapter.
//!
//! Implements the standard health checking protocol
//! (https://github.com/grpc/grpc/blob/master/doc/health-checking.md).
//!
//! # Data Flow
//! ```text
//! Check(service)
//!     ""  | grpc.health.v1.GRPCHealth → HealthCheck::is_healthy()
//!           grpc.health.v1.GRPCReady  → ReadinessCheck::is_ready(now + timeout)
//!           anything else             → NOT_FOUND
//!     → SERVING | NOT_SERVING
//!
//! Watch(health)
//!     current status, then NOT_SERVING when the latch trips
//! ```

pub mod client;
pub mod server;

/// Service name answered with the health verdict.
pub const HEALTH_SERVICE: &str = "grpc.health.v1.GRPCHealth";

/// Service name answered with the readiness verdict.
pub const READY_SERVICE: &str = "grpc.health.v1.GRPCReady";

pub use client::{check_health, check_ready, GrpcCheckError, GrpcHealthProbe};
pub use server::GrpcProbeService;
