//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (threshold > 0, window > 0, addresses parse)
//! - Detect duplicate probe names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SidecarConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{ProbeConfig, SidecarConfig};

/// One semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("health.max_errors_per_window must be greater than zero")]
    ZeroThreshold,

    #[error("health.window_secs must be greater than zero")]
    ZeroWindow,

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: String, value: String },

    #[error("probe {name}: {value} is not a host:port address")]
    InvalidEndpoint { name: String, value: String },

    #[error("probe {name}: invalid url {url}")]
    InvalidUrl { name: String, url: String },

    #[error("probe name must not be empty")]
    EmptyProbeName,

    #[error("duplicate probe name: {0}")]
    DuplicateProbe(String),

    #[error("neither http nor grpc is enabled, nothing would be served")]
    NothingEnabled,
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &SidecarConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.health.max_errors_per_window == 0 {
        errors.push(ValidationError::ZeroThreshold);
    }
    if config.health.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    }

    if !config.http.enabled && !config.grpc.enabled {
        errors.push(ValidationError::NothingEnabled);
    }
    if config.http.enabled {
        check_socket_addr("http.bind_address", &config.http.bind_address, &mut errors);
    }
    if config.grpc.enabled {
        check_socket_addr("grpc.bind_address", &config.grpc.bind_address, &mut errors);
    }

    let mut seen = HashSet::new();
    for probe in &config.readiness.probes {
        let name = probe.name();
        if name.is_empty() {
            errors.push(ValidationError::EmptyProbeName);
        } else if !seen.insert(name) {
            errors.push(ValidationError::DuplicateProbe(name.to_string()));
        }

        match probe {
            ProbeConfig::Tcp { address, .. } => {
                if !is_host_port(address) {
                    errors.push(ValidationError::InvalidEndpoint {
                        name: name.to_string(),
                        value: address.clone(),
                    });
                }
            }
            ProbeConfig::Http { url, .. } => {
                if Url::parse(url).is_err() {
                    errors.push(ValidationError::InvalidUrl {
                        name: name.to_string(),
                        url: url.clone(),
                    });
                }
            }
            ProbeConfig::Grpc { address, .. } => {
                // Either a full URI or the bare host:port the client prefixes with http://.
                let valid = if address.contains("://") {
                    Url::parse(address).is_ok_and(|url| url.host().is_some())
                } else {
                    is_host_port(address)
                };
                if !valid {
                    errors.push(ValidationError::InvalidUrl {
                        name: name.to_string(),
                        url: address.clone(),
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` with a non-empty host (name, IPv4 or bracketed IPv6) and a u16 port.
fn is_host_port(value: &str) -> bool {
    match value.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && !host.contains('/') && port.parse::<u16>().is_ok(),
        None => false,
    }
}

fn check_socket_addr(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}
