//! Error-rate health listener.
//!
//! # Responsibilities
//! - Consume reported errors, one at a time, in arrival order
//! - Feed them into the windowed counter (state.rs)
//! - Notify the subscriber when the latch trips
//!
//! # Design Decisions
//! - The query handle and the consuming loop are separate values; `run`
//!   takes the listener by value so it can only ever be started once
//! - Count, window and latch live behind one mutex and are updated together
//! - The subscriber is called after the lock is released, from the listener task

use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::Dispatch;

use crate::config::HealthConfig;
use crate::health::channel::{error_channel, Envelope, ErrorReceiver, ErrorReporter};
use crate::health::state::{HealthState, HealthStatus, Transition};
use crate::health::{HealthCheck, UnhealthyCallback};
use crate::observability::logging::scoped;

struct Shared {
    state: HealthState,
    subscriber: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Query handle for the error-rate health verdict. Cheap to clone.
#[derive(Clone)]
pub struct ErrorRateMonitor {
    shared: Arc<Mutex<Shared>>,
}

/// The consuming side; drive it with [`ErrorListener::run`].
pub struct ErrorListener {
    shared: Arc<Mutex<Shared>>,
    receiver: ErrorReceiver,
    threshold: usize,
    dispatch: Option<Dispatch>,
}

impl ErrorRateMonitor {
    /// Build the monitor, its listener and the first reporter.
    pub fn new(config: &HealthConfig) -> (Self, ErrorListener, ErrorReporter) {
        let shared = Arc::new(Mutex::new(Shared {
            state: HealthState::new(config.max_errors_per_window, config.window()),
            subscriber: None,
        }));
        let (reporter, receiver) = error_channel(config.channel_capacity);

        let listener = ErrorListener {
            shared: shared.clone(),
            receiver,
            threshold: config.max_errors_per_window,
            dispatch: None,
        };
        (Self { shared }, listener, reporter)
    }
}

impl HealthCheck for ErrorRateMonitor {
    fn is_healthy(&self) -> HealthStatus {
        lock(&self.shared).state.status()
    }

    fn subscribe(&self, callback: UnhealthyCallback) {
        lock(&self.shared).subscriber = Some(Arc::from(callback));
    }
}

impl ErrorListener {
    /// Log through `dispatch` instead of the ambient subscriber.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Consume errors until shutdown is signalled or every reporter is gone.
    pub async fn run(self, shutdown: broadcast::Receiver<()>) {
        let dispatch = self.dispatch.clone();
        scoped(self.consume(shutdown), dispatch.as_ref()).await
    }

    async fn consume(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!("Starting health listener");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                received = self.receiver.recv() => match received {
                    Some(envelope) => self.process(envelope),
                    None => {
                        tracing::debug!("All error reporters dropped");
                        break;
                    }
                },
            }
        }
        tracing::debug!("Exiting health listener");
    }

    fn process(&self, envelope: Envelope) {
        let Envelope { event, ack } = envelope;
        if let Some(cause) = event.cause.as_deref() {
            self.record(cause, event.occurred_at);
        }
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    fn record(&self, cause: &(dyn Error + Send + Sync), occurred_at: SystemTime) {
        tracing::warn!(error = %cause, "Health check registered an error, will evaluate health toleration");

        let notify = {
            let mut shared = lock(&self.shared);
            match shared.state.record_error(Instant::now(), occurred_at, &cause) {
                Transition::Tolerated { count } => {
                    tracing::debug!(count, threshold = self.threshold, "Error count is within the acceptable amount");
                    None
                }
                Transition::AlreadyLatched { count } => {
                    tracing::debug!(count, "Health already reported as failed");
                    None
                }
                Transition::Latched { reason } => {
                    tracing::warn!(
                        count = shared.state.window_count(),
                        threshold = self.threshold,
                        "Too many critical errors, will report health failure"
                    );
                    shared.subscriber.clone().map(|callback| (callback, reason))
                }
            }
        };

        if let Some((callback, reason)) = notify {
            if catch_unwind(AssertUnwindSafe(|| callback(&reason))).is_err() {
                tracing::error!("Unhealthy subscriber panicked");
            }
        }
    }
}
