//! Fixed-interval retry loop.
//!
//! # Design Decisions
//! - The interval is constant; readiness probes are cheap and the overall
//!   query is already bounded by a deadline
//! - Sleep happens only *between* attempts
//! - The last error is returned unchanged so callers can report it verbatim

use std::future::Future;
use std::time::Duration;

use crate::resilience::sleep::Sleeper;

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on attempts. Zero behaves like one.
    pub max_attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Effective number of attempts.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `op` until it succeeds or attempts are exhausted.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, sleeper: &dyn Sleeper, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => return Err(e),
                Err(_) => {
                    sleeper.sleep(self.interval).await;
                    attempt += 1;
                }
            }
        }
    }
}
