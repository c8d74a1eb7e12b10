//! Sleep primitive used between readiness retries.
//!
//! Kept behind a trait so tests can swap the real timer for a recorder.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

/// Suspends the calling task for a while.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the Tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tracing::info!(?duration, "Will sleep");
        tokio::time::sleep(duration).await;
        tracing::info!("Woke up, will continue working");
    }
}

#[derive(Debug, Default)]
struct Recorded {
    count: usize,
    last: Option<Duration>,
}

/// Sleeper that returns immediately and remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    recorded: Mutex<Recorded>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn was_triggered(&self) -> bool {
        self.trigger_count() > 0
    }

    pub fn trigger_count(&self) -> usize {
        self.lock().count
    }

    /// Duration passed to the most recent `sleep` call.
    pub fn last_duration(&self) -> Option<Duration> {
        self.lock().last
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let mut recorded = self.lock();
        recorded.count += 1;
        recorded.last = Some(duration);
    }
}
