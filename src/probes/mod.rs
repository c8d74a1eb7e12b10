//! Built-in readiness probes.
//!
//! # Responsibilities
//! - TCP connect checks (tcp.rs)
//! - HTTP GET checks (http.rs)
//! - gRPC health checks (grpc::client)
//! - Build probes from `[[readiness.probes]]` entries
//!
//! # Design Decisions
//! - Every built-in check carries its own timeout so one hung dependency
//!   only burns its own attempt, not the whole readiness deadline

pub mod http;
pub mod tcp;

use std::time::Duration;

use crate::config::ProbeConfig;
use crate::grpc::client::GrpcHealthProbe;
use crate::readiness::Probe;

pub use self::http::HttpProbe;
pub use self::tcp::TcpProbe;

/// Build a probe from its configuration entry.
pub fn from_config(config: &ProbeConfig) -> Probe {
    match config {
        ProbeConfig::Tcp {
            name,
            address,
            timeout_ms,
        } => Probe::new(
            name.clone(),
            TcpProbe::new(address.clone(), Duration::from_millis(*timeout_ms)),
        ),
        ProbeConfig::Http {
            name,
            url,
            timeout_ms,
        } => Probe::new(
            name.clone(),
            HttpProbe::new(url.clone(), Duration::from_millis(*timeout_ms)),
        ),
        ProbeConfig::Grpc {
            name,
            address,
            service,
        } => Probe::new(name.clone(), GrpcHealthProbe::new(address.clone(), service.clone())),
    }
}
