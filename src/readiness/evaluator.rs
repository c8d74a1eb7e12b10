//! Concurrent readiness evaluation.
//!
//! # Responsibilities
//! - Run every probe in its own task on each query
//! - Retry failing probes with a fixed pause (resilience::retries)
//! - Collect outcomes until all arrive or the deadline passes
//!
//! # Design Decisions
//! - Fan-in is message passing: each worker sends one outcome over a channel
//!   sized to the probe count, so a worker never waits on a gone collector
//! - On deadline the workers keep running; their late outcomes are dropped
//! - Failures are reported in the order they were collected

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::instrument::WithSubscriber;
use tracing::Dispatch;

use crate::config::ReadinessConfig;
use crate::observability::logging::scoped;
use crate::readiness::probe::{Probe, ProbeError};
use crate::readiness::{ProbeFailure, ReadinessCheck, ReadinessError};
use crate::resilience::retries::RetryPolicy;
use crate::resilience::sleep::Sleeper;

/// Final result of one probe within one query.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub name: Arc<str>,
    pub result: Result<(), ProbeError>,
}

impl ProbeOutcome {
    pub fn is_ready(&self) -> bool {
        self.result.is_ok()
    }
}

/// Runs a fixed probe set concurrently under one deadline.
pub struct ReadinessEvaluator {
    probes: Arc<[Probe]>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    dispatch: Option<Dispatch>,
}

impl ReadinessEvaluator {
    pub fn new(probes: Vec<Probe>, policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            probes: probes.into(),
            policy,
            sleeper,
            dispatch: None,
        }
    }

    pub fn from_config(probes: Vec<Probe>, config: &ReadinessConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self::new(
            probes,
            RetryPolicy::new(config.max_attempts, config.retry_interval()),
            sleeper,
        )
    }

    /// Log through `dispatch` instead of the ambient subscriber.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Run all probes and aggregate their verdicts before `deadline`.
    pub async fn is_ready(&self, deadline: Instant) -> Result<(), ReadinessError> {
        scoped(self.evaluate(deadline), self.dispatch.as_ref()).await
    }

    async fn evaluate(&self, deadline: Instant) -> Result<(), ReadinessError> {
        let total = self.probes.len();
        if total == 0 {
            return Ok(());
        }
        if Instant::now() >= deadline {
            tracing::warn!("Readiness deadline already passed, probes not started");
            return Err(ReadinessError::Timeout);
        }

        tracing::debug!(probes = total, "Will execute readiness probes");

        let (tx, mut rx) = mpsc::channel(total);
        for probe in self.probes.iter().cloned() {
            let tx = tx.clone();
            let policy = self.policy;
            let sleeper = self.sleeper.clone();
            let worker = async move {
                let outcome = check_probe(probe, policy, sleeper.as_ref()).await;
                // Fails only when the collector already gave up on the deadline.
                let _ = tx.send(outcome).await;
            };
            tokio::spawn(worker.with_current_subscriber());
        }
        drop(tx);

        let expired = tokio::time::sleep_until(deadline);
        tokio::pin!(expired);

        let mut collected = 0;
        let mut failures = Vec::new();
        while collected < total {
            tokio::select! {
                biased;
                _ = &mut expired => {
                    tracing::warn!(collected, total, "Readiness probes did not finish before the deadline");
                    return Err(ReadinessError::Timeout);
                }
                received = rx.recv() => match received {
                    Some(outcome) => {
                        collected += 1;
                        if let Err(error) = outcome.result {
                            failures.push(ProbeFailure {
                                name: outcome.name.to_string(),
                                error,
                            });
                        }
                    }
                    None => {
                        tracing::error!(collected, total, "Readiness workers stopped without reporting");
                        return Err(ReadinessError::Interrupted);
                    }
                },
            }
        }

        if failures.is_empty() {
            tracing::debug!("All readiness probes passed");
            Ok(())
        } else {
            Err(ReadinessError::ProbesFailed(failures))
        }
    }
}

#[async_trait::async_trait]
impl ReadinessCheck for ReadinessEvaluator {
    async fn is_ready(&self, deadline: Instant) -> Result<(), ReadinessError> {
        ReadinessEvaluator::is_ready(self, deadline).await
    }
}

async fn check_probe(probe: Probe, policy: RetryPolicy, sleeper: &dyn Sleeper) -> ProbeOutcome {
    let target = &probe;
    let result = policy
        .run(sleeper, move |attempt| async move {
            tracing::debug!(probe = target.name(), attempt, "Will check if probe is ready");
            let result = target.attempt().await;
            match &result {
                Ok(()) => tracing::debug!(probe = target.name(), "Probe is ready"),
                Err(e) => tracing::warn!(probe = target.name(), attempt, error = %e, "Probe is not ready"),
            }
            result
        })
        .await;

    ProbeOutcome {
        name: probe.shared_name(),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::sleep::RecordingSleeper;
    use crate::BoxError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn evaluator(probes: Vec<Probe>, attempts: u32, sleeper: Arc<RecordingSleeper>) -> ReadinessEvaluator {
        ReadinessEvaluator::new(probes, RetryPolicy::new(attempts, Duration::from_secs(1)), sleeper)
    }

    fn failing(name: &str, message: &'static str) -> Probe {
        Probe::from_fn(name, move || async move { Err::<(), BoxError>(message.into()) })
    }

    fn passing(name: &str) -> Probe {
        Probe::from_fn(name, || async { Ok::<(), BoxError>(()) })
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_no_probes_is_ready() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = evaluator(vec![], 10, sleeper);

        assert!(checker.is_ready(soon()).await.is_ok());
        assert!(checker.is_ready(Instant::now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_success_never_sleeps() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = evaluator(vec![passing("ok")], 10, sleeper.clone());

        assert!(checker.is_ready(soon()).await.is_ok());
        assert!(!sleeper.was_triggered());
    }

    #[tokio::test]
    async fn test_single_attempt_failure() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = evaluator(vec![failing("TestCheckerFailure", "some error")], 1, sleeper.clone());

        let err = checker.is_ready(soon()).await.unwrap_err();
        assert_eq!(err.to_string(), "Readiness probe failed for TestCheckerFailure: some error");
        assert!(!sleeper.was_triggered());
    }

    #[tokio::test]
    async fn test_multiple_failures_are_all_reported() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = evaluator(
            vec![failing("first", "some error 1"), failing("second", "some error 2")],
            1,
            sleeper,
        );

        let err = checker.is_ready(soon()).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Readiness probe failed for first: some error 1"));
        assert!(text.contains("Readiness probe failed for second: some error 2"));
        assert!(text.contains(", "));
        match err {
            ReadinessError::ProbesFailed(failures) => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_only_failing_probe_is_reported() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = evaluator(vec![failing("broken", "Some error 1"), passing("fine")], 1, sleeper);

        let err = checker.is_ready(soon()).await.unwrap_err();
        assert_eq!(err.to_string(), "Readiness probe failed for broken: Some error 1");
    }

    #[tokio::test]
    async fn test_retries_sleep_between_attempts() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let probe = Probe::from_fn("flaky", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), BoxError>("Some error 234".into()) }
        });
        let checker = evaluator(vec![probe], 2, sleeper.clone());

        let err = checker.is_ready(soon()).await.unwrap_err();

        assert_eq!(err.to_string(), "Readiness probe failed for flaky: Some error 234");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(sleeper.trigger_count(), 1);
        assert_eq!(sleeper.last_duration(), Some(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_each_failing_probe_sleeps_independently() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let probes = (0..3).map(|i| failing(&format!("p{i}"), "down")).collect();
        let checker = evaluator(probes, 2, sleeper.clone());

        assert!(checker.is_ready(soon()).await.is_err());
        assert_eq!(sleeper.trigger_count(), 3);
    }

    #[tokio::test]
    async fn test_second_attempt_succeeds() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let probe = Probe::from_fn("warming", move || {
            let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
            async move {
                if first {
                    Err::<(), BoxError>("not ready".into())
                } else {
                    Ok(())
                }
            }
        });
        let checker = evaluator(vec![probe], 2, sleeper.clone());

        assert!(checker.is_ready(soon()).await.is_ok());
        assert_eq!(sleeper.trigger_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_deadline_times_out() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = evaluator(vec![passing("instant")], 1, sleeper);

        let err = checker.is_ready(Instant::now()).await.unwrap_err();
        assert!(matches!(err, ReadinessError::Timeout));
        assert!(err.to_string().contains("context timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_times_out_and_late_result_is_dropped() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let finished = Arc::new(AtomicUsize::new(0));
        let done = finished.clone();
        let probe = Probe::from_fn("slow", move || {
            let done = done.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok::<(), BoxError>(())
            }
        });
        let checker = evaluator(vec![probe, passing("fast")], 1, sleeper);

        let err = checker
            .is_ready(Instant::now() + Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ReadinessError::Timeout));

        // The worker keeps running in the background and its send is discarded.
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_probe_is_not_ready() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let probe = Probe::blocking("explodes", || -> Result<(), std::io::Error> { panic!("boom") });
        let checker = evaluator(vec![probe, passing("fine")], 1, sleeper);

        let err = checker.is_ready(soon()).await.unwrap_err();
        assert_eq!(err.to_string(), "Readiness probe failed for explodes: probe panicked: boom");
    }

    #[tokio::test]
    async fn test_usable_through_trait_object() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker: Arc<dyn ReadinessCheck> = Arc::new(evaluator(vec![passing("ok")], 1, sleeper));
        assert!(checker.is_ready(soon()).await.is_ok());
    }

    #[tokio::test]
    async fn test_injected_dispatch_sees_worker_logs() {
        use crate::observability::logging::testing::Counting;

        let count = Arc::new(AtomicUsize::new(0));
        let sleeper = Arc::new(RecordingSleeper::new());
        let checker = evaluator(vec![failing("db", "refused")], 1, sleeper)
            .with_dispatch(Dispatch::new(Counting(count.clone())));

        assert!(checker.is_ready(soon()).await.is_err());
        // Collector debug line plus the worker's attempt and failure lines.
        assert!(count.load(Ordering::SeqCst) >= 3);
    }
}
