//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use healthz::config::HealthConfig;
use healthz::grpc::GrpcProbeService;
use healthz::health::{ErrorRateMonitor, ErrorReporter, HealthCheck};
use healthz::http::ProbeServer;
use healthz::lifecycle::Shutdown;
use healthz::readiness::{Probe, ReadinessCheck, ReadinessEvaluator};
use healthz::resilience::{RetryPolicy, TokioSleeper};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Start a programmable HTTP dependency on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let (status, body) = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    404 => "404 Not Found",
                    500 => "500 Internal Server Error",
                    503 => "503 Service Unavailable",
                    _ => "200 OK",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status_text,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Sidecar settings for one test.
pub struct SidecarSetup {
    pub max_errors: usize,
    pub probes: Vec<Probe>,
    pub max_attempts: u32,
    pub retry_interval: Duration,
    pub readiness_timeout: Duration,
}

impl Default for SidecarSetup {
    fn default() -> Self {
        Self {
            max_errors: 2,
            probes: Vec::new(),
            max_attempts: 1,
            retry_interval: Duration::from_millis(10),
            readiness_timeout: Duration::from_secs(5),
        }
    }
}

/// A running sidecar: both adapters, the error listener and its reporter.
pub struct Sidecar {
    pub http: SocketAddr,
    pub grpc: SocketAddr,
    pub reporter: ErrorReporter,
    pub shutdown: Shutdown,
    pub tasks: Vec<JoinHandle<()>>,
}

impl Sidecar {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.http, path)
    }

    /// Trigger shutdown and wait for every task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        for task in self.tasks {
            tokio::time::timeout(Duration::from_secs(5), task)
                .await
                .expect("task did not stop")
                .unwrap();
        }
    }
}

pub async fn spawn_sidecar(setup: SidecarSetup) -> Sidecar {
    let shutdown = Shutdown::new();

    let config = HealthConfig {
        max_errors_per_window: setup.max_errors,
        window_secs: 60,
        channel_capacity: 0,
    };
    let (monitor, listener, reporter) = ErrorRateMonitor::new(&config);
    let mut tasks = vec![tokio::spawn(listener.run(shutdown.subscribe()))];

    let evaluator = ReadinessEvaluator::new(
        setup.probes,
        RetryPolicy::new(setup.max_attempts, setup.retry_interval),
        Arc::new(TokioSleeper),
    );
    let health: Arc<dyn HealthCheck> = Arc::new(monitor);
    let readiness: Arc<dyn ReadinessCheck> = Arc::new(evaluator);

    let http_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http = http_listener.local_addr().unwrap();
    let server = ProbeServer::new()
        .with_health(health.clone())
        .with_readiness(readiness.clone(), setup.readiness_timeout);
    let rx = shutdown.subscribe();
    tasks.push(tokio::spawn(async move { server.run(http_listener, rx).await.unwrap() }));

    let grpc_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let grpc = grpc_listener.local_addr().unwrap();
    let service = GrpcProbeService::new()
        .with_health(health)
        .with_readiness(readiness, setup.readiness_timeout);
    let rx = shutdown.subscribe();
    tasks.push(tokio::spawn(async move { service.serve(grpc_listener, rx).await.unwrap() }));

    Sidecar {
        http,
        grpc,
        reporter,
        shutdown,
        tasks,
    }
}
