//! End-to-end tests for the HTTP adapter.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use healthz::probes::{HttpProbe, TcpProbe};
use healthz::readiness::Probe;
use healthz::BoxError;
use reqwest::StatusCode;

mod common;
use common::{spawn_sidecar, SidecarSetup};

#[tokio::test]
async fn test_healthz_latches_after_error_burst() {
    let sidecar = spawn_sidecar(SidecarSetup::default()).await;

    let res = reqwest::get(sidecar.url("/healthz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().is_empty());

    // Handoff channel: each report returns once the listener has counted it.
    for _ in 0..3 {
        sidecar.reporter.report("db down").await.unwrap();
    }

    let res = reqwest::get(sidecar.url("/healthz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.text().await.unwrap();
    assert!(body.starts_with("Too many critical errors 3"), "{body}");
    assert!(body.ends_with("last error: db down"), "{body}");

    let status: serde_json::Value = reqwest::get(sidecar.url("/status")).await.unwrap().json().await.unwrap();
    assert_eq!(status["healthy"], false);
    assert_eq!(status["reason"], body.as_str());

    sidecar.stop().await;
}

#[tokio::test]
async fn test_nil_errors_keep_service_healthy() {
    let sidecar = spawn_sidecar(SidecarSetup::default()).await;

    for _ in 0..5 {
        sidecar.reporter.report_opt(None).await.unwrap();
    }

    let res = reqwest::get(sidecar.url("/healthz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    sidecar.stop().await;
}

#[tokio::test]
async fn test_readyz_retries_flaky_dependency() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let backend = common::start_programmable_backend(move || {
        let counter = counter.clone();
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                (503, "warming up".to_string())
            } else {
                (200, "ok".to_string())
            }
        }
    })
    .await;

    let probe = Probe::new(
        "upstream",
        HttpProbe::new(format!("http://{backend}/ready"), Duration::from_secs(1)),
    );
    let sidecar = spawn_sidecar(SidecarSetup {
        probes: vec![probe],
        max_attempts: 3,
        ..SidecarSetup::default()
    })
    .await;

    let res = reqwest::get(sidecar.url("/readyz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    sidecar.stop().await;
}

#[tokio::test]
async fn test_readyz_reports_every_failing_probe() {
    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let closed_addr = closed.local_addr().unwrap();
    drop(closed);

    let probes = vec![
        Probe::new("postgres", TcpProbe::new(closed_addr.to_string(), Duration::from_secs(1))),
        Probe::from_fn("migrations", || async { Err::<(), BoxError>("pending".into()) }),
        Probe::from_fn("cache", || async { Ok::<(), BoxError>(()) }),
    ];
    let sidecar = spawn_sidecar(SidecarSetup {
        probes,
        max_attempts: 2,
        ..SidecarSetup::default()
    })
    .await;

    let res = reqwest::get(sidecar.url("/readyz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = res.text().await.unwrap();
    assert!(body.contains("Readiness probe failed for postgres: connect to"), "{body}");
    assert!(body.contains("Readiness probe failed for migrations: pending"), "{body}");
    assert!(!body.contains("cache"), "{body}");
    assert_eq!(body.matches(", ").count(), 1, "{body}");

    sidecar.stop().await;
}

#[tokio::test]
async fn test_readyz_times_out_on_hung_probe() {
    let probes = vec![Probe::from_fn("hung", || async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok::<(), BoxError>(())
    })];
    let sidecar = spawn_sidecar(SidecarSetup {
        probes,
        readiness_timeout: Duration::from_millis(100),
        ..SidecarSetup::default()
    })
    .await;

    let started = std::time::Instant::now();
    let res = reqwest::get(sidecar.url("/readyz")).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        res.text().await.unwrap(),
        "readiness probes failed due to the context timeout"
    );

    sidecar.stop().await;
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let sidecar = spawn_sidecar(SidecarSetup::default()).await;

    let res = reqwest::get(sidecar.url("/metrics")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    sidecar.stop().await;
}
