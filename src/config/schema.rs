//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sidecar.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the health/readiness sidecar.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SidecarConfig {
    /// HTTP probe endpoints.
    pub http: HttpConfig,

    /// gRPC health service.
    pub grpc: GrpcConfig,

    /// Error-rate health evaluation.
    pub health: HealthConfig,

    /// Readiness evaluation and probe set.
    pub readiness: ReadinessConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:9244").
    pub bind_address: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:9244".to_string(),
        }
    }
}

/// gRPC adapter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GrpcConfig {
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:9245").
    pub bind_address: String,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "0.0.0.0:9245".to_string(),
        }
    }
}

/// Error-rate health configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Maximum errors tolerated within one window.
    pub max_errors_per_window: usize,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Error channel buffer. Zero means every report waits for the listener.
    pub channel_capacity: usize,
}

impl HealthConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_errors_per_window: 10,
            window_secs: 60,
            channel_capacity: 0,
        }
    }
}

/// Readiness configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Deadline for one readiness query, in milliseconds.
    pub timeout_ms: u64,

    /// Attempts per probe before it is reported not ready.
    pub max_attempts: u32,

    /// Pause between attempts of one probe, in milliseconds.
    pub retry_interval_ms: u64,

    /// Probes built by the sidecar binary.
    pub probes: Vec<ProbeConfig>,
}

impl ReadinessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_attempts: 3,
            retry_interval_ms: 500,
            probes: Vec::new(),
        }
    }
}

/// A readiness probe definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    /// TCP connect to `address`.
    Tcp {
        name: String,
        address: String,
        #[serde(default = "default_probe_timeout_ms")]
        timeout_ms: u64,
    },
    /// HTTP GET on `url`, ready on any 2xx.
    Http {
        name: String,
        url: String,
        #[serde(default = "default_probe_timeout_ms")]
        timeout_ms: u64,
    },
    /// gRPC health `Check` against `address` for `service`.
    Grpc {
        name: String,
        address: String,
        #[serde(default)]
        service: String,
    },
}

impl ProbeConfig {
    pub fn name(&self) -> &str {
        match self {
            ProbeConfig::Tcp { name, .. }
            | ProbeConfig::Http { name, .. }
            | ProbeConfig::Grpc { name, .. } => name,
        }
    }
}

fn default_probe_timeout_ms() -> u64 {
    1_000
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "healthz=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: SidecarConfig = toml::from_str("").unwrap();
        assert!(config.http.enabled);
        assert!(!config.grpc.enabled);
        assert_eq!(config.health.max_errors_per_window, 10);
        assert_eq!(config.health.window(), Duration::from_secs(60));
        assert_eq!(config.readiness.timeout(), Duration::from_secs(5));
        assert!(config.readiness.probes.is_empty());
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_probe_kinds_deserialize() {
        let config: SidecarConfig = toml::from_str(
            r#"
            [readiness]
            max_attempts = 2

            [[readiness.probes]]
            kind = "tcp"
            name = "postgres"
            address = "127.0.0.1:5432"

            [[readiness.probes]]
            kind = "http"
            name = "upstream"
            url = "http://127.0.0.1:8080/health"
            timeout_ms = 250

            [[readiness.probes]]
            kind = "grpc"
            name = "billing"
            address = "http://127.0.0.1:50051"
            "#,
        )
        .unwrap();

        let probes = &config.readiness.probes;
        assert_eq!(probes.len(), 3);
        assert_eq!(
            probes[0],
            ProbeConfig::Tcp {
                name: "postgres".into(),
                address: "127.0.0.1:5432".into(),
                timeout_ms: 1_000,
            }
        );
        assert_eq!(probes[1].name(), "upstream");
        assert_eq!(
            probes[2],
            ProbeConfig::Grpc {
                name: "billing".into(),
                address: "http://127.0.0.1:50051".into(),
                service: String::new(),
            }
        );
    }
}
