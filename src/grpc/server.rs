//! gRPC health service.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tokio_stream::wrappers::{TcpListenerStream, WatchStream};
use tokio_stream::{Stream, StreamExt};
use tonic::{Request, Response, Status};
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_server::{Health, HealthServer};
use tonic_health::pb::{HealthCheckRequest, HealthCheckResponse};

use crate::grpc::{HEALTH_SERVICE, READY_SERVICE};
use crate::health::{HealthCheck, HealthStatus};
use crate::http::server::ReadinessRoute;
use crate::lifecycle::shutdown;
use crate::readiness::ReadinessCheck;

enum Target<'a> {
    Health(&'a Arc<dyn HealthCheck>),
    Ready(&'a ReadinessRoute),
}

/// Health/readiness verdicts exposed through `grpc.health.v1.Health`.
#[derive(Clone, Default)]
pub struct GrpcProbeService {
    health: Option<Arc<dyn HealthCheck>>,
    changes: Option<watch::Receiver<ServingStatus>>,
    readiness: Option<ReadinessRoute>,
}

impl GrpcProbeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer health checks from `checker`.
    ///
    /// Takes over the checker's unhealthy subscription to feed `Watch` streams.
    pub fn with_health(mut self, checker: Arc<dyn HealthCheck>) -> Self {
        let (tx, rx) = watch::channel(serving_status(&checker.is_healthy()));
        let tx = Arc::new(tx);
        let notify = tx.clone();
        checker.subscribe(Box::new(move |_reason: &str| {
            notify.send_replace(ServingStatus::NotServing);
        }));
        // The latch may have tripped before the callback was installed.
        if !checker.is_healthy().is_healthy() {
            tx.send_replace(ServingStatus::NotServing);
        }
        self.health = Some(checker);
        self.changes = Some(rx);
        self
    }

    /// Answer readiness checks from `checker`, each bounded by `timeout`.
    pub fn with_readiness(mut self, checker: Arc<dyn ReadinessCheck>, timeout: Duration) -> Self {
        self.readiness = Some(ReadinessRoute { checker, timeout });
        self
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), tonic::transport::Error> {
        tracing::info!(address = ?listener.local_addr().ok(), "Starting health/ready gRPC server");
        tonic::transport::Server::builder()
            .add_service(HealthServer::new(self))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown::wait(shutdown))
            .await?;
        tracing::info!("gRPC server stopped");
        Ok(())
    }

    fn target(&self, service: &str) -> Result<Target<'_>, Status> {
        match service {
            "" | HEALTH_SERVICE => self.health.as_ref().map(Target::Health),
            READY_SERVICE => self.readiness.as_ref().map(Target::Ready),
            _ => None,
        }
        .ok_or_else(|| {
            Status::not_found(format!(
                "unknown service: {service} expected name is {HEALTH_SERVICE} or {READY_SERVICE}"
            ))
        })
    }
}

fn serving_status(status: &HealthStatus) -> ServingStatus {
    if status.is_healthy() {
        ServingStatus::Serving
    } else {
        ServingStatus::NotServing
    }
}

fn response(status: ServingStatus) -> HealthCheckResponse {
    HealthCheckResponse {
        status: status as i32,
    }
}

#[tonic::async_trait]
impl Health for GrpcProbeService {
    type WatchStream = Pin<Box<dyn Stream<Item = Result<HealthCheckResponse, Status>> + Send + 'static>>;

    async fn check(&self, request: Request<HealthCheckRequest>) -> Result<Response<HealthCheckResponse>, Status> {
        let service = request.into_inner().service;
        tracing::debug!(service = %service, "gRPC check");

        let status = match self.target(&service)? {
            Target::Health(checker) => {
                let verdict = checker.is_healthy();
                if !verdict.is_healthy() {
                    tracing::warn!(reason = verdict.reason(), "GRPC health check failure");
                }
                serving_status(&verdict)
            }
            Target::Ready(route) => match route.checker.is_ready(Instant::now() + route.timeout).await {
                Ok(()) => ServingStatus::Serving,
                Err(e) => {
                    tracing::warn!(error = %e, "GRPC ready check failure");
                    ServingStatus::NotServing
                }
            },
        };

        Ok(Response::new(response(status)))
    }

    async fn watch(&self, request: Request<HealthCheckRequest>) -> Result<Response<Self::WatchStream>, Status> {
        let service = request.into_inner().service;
        tracing::debug!(service = %service, "gRPC watch");

        if let Target::Ready(_) = self.target(&service)? {
            return Err(Status::unimplemented("watch is not supported for readiness"));
        }
        let changes = self
            .changes
            .clone()
            .ok_or_else(|| Status::internal("health watch channel missing"))?;

        let stream = WatchStream::new(changes).map(|status| Ok(response(status)));
        Ok(Response::new(Box::pin(stream) as Self::WatchStream))
    }
}
