//! gRPC health checking client.
//!
//! Used by the CLI and by `kind = "grpc"` readiness probes.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tonic::transport::Endpoint;
use tonic::Code;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;

use crate::grpc::{HEALTH_SERVICE, READY_SERVICE};
use crate::readiness::ProbeCheck;
use crate::BoxError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const RPC_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a remote health check did not report `SERVING`.
#[derive(Debug, Error)]
pub enum GrpcCheckError {
    #[error("GRPC server of {name} is unreachable: {source}")]
    Connect {
        name: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("GRPC server of {name} does not implement the grpc health protocol")]
    Unimplemented { name: String },

    #[error("GRPC server of {name} timeout: rpc did not complete within {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error("GRPC server of {name} has failed: {status}")]
    Failed { name: String, status: tonic::Status },

    #[error("GRPC server of {name} is not serving: {status:?}")]
    NotServing { name: String, status: ServingStatus },
}

/// Ask `address` for its health verdict.
pub async fn check_health(address: &str, name: &str) -> Result<(), GrpcCheckError> {
    check_service(address, name, HEALTH_SERVICE).await
}

/// Ask `address` for its readiness verdict.
pub async fn check_ready(address: &str, name: &str) -> Result<(), GrpcCheckError> {
    check_service(address, name, READY_SERVICE).await
}

/// Run one `Check` for `service` against `address`.
///
/// `name` only labels errors and logs.
pub async fn check_service(address: &str, name: &str, service: &str) -> Result<(), GrpcCheckError> {
    let connect_err = |source| GrpcCheckError::Connect {
        name: name.to_string(),
        source,
    };

    let channel = Endpoint::from_shared(with_scheme(address))
        .map_err(connect_err)?
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(RPC_TIMEOUT)
        .connect()
        .await
        .map_err(connect_err)?;

    let request = HealthCheckRequest {
        service: service.to_string(),
    };
    let response = HealthClient::new(channel)
        .check(request)
        .await
        .map_err(|status| classify(name, status))?;

    let status = ServingStatus::try_from(response.into_inner().status).unwrap_or(ServingStatus::Unknown);
    if status != ServingStatus::Serving {
        tracing::warn!(name, service, status = ?status, "gRPC health check reported not serving");
        return Err(GrpcCheckError::NotServing {
            name: name.to_string(),
            status,
        });
    }

    tracing::debug!(name, service, "gRPC health check passed");
    Ok(())
}

fn classify(name: &str, status: tonic::Status) -> GrpcCheckError {
    let name = name.to_string();
    match status.code() {
        Code::Unimplemented => GrpcCheckError::Unimplemented { name },
        // The client-side timeout layer surfaces as Cancelled.
        Code::DeadlineExceeded | Code::Cancelled => GrpcCheckError::Timeout {
            name,
            timeout: RPC_TIMEOUT,
        },
        _ => GrpcCheckError::Failed { name, status },
    }
}

fn with_scheme(address: &str) -> String {
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

/// Readiness probe that passes when a remote gRPC health service is `SERVING`.
#[derive(Debug, Clone)]
pub struct GrpcHealthProbe {
    address: String,
    service: String,
}

impl GrpcHealthProbe {
    pub fn new(address: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            service: service.into(),
        }
    }
}

#[async_trait]
impl ProbeCheck for GrpcHealthProbe {
    async fn check(&self) -> Result<(), BoxError> {
        check_service(&self.address, &self.address, &self.service).await?;
        Ok(())
    }
}
