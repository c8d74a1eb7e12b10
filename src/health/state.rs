//! Error-rate health state machine.
//!
//! # States
//! - Healthy: errors so far fit within the tolerated rate
//! - Latched: the threshold was exceeded once; never leaves this state
//!
//! # State Transitions
//! ```text
//! Healthy → Latched: window_count > threshold
//! Latched → (none)
//! ```
//!
//! # Window accounting
//! A window restarts only on an error that arrives after the current window
//! expired *and* while the running count is still within the threshold. Once
//! the threshold has been crossed the restart condition can no longer hold,
//! which is what makes the verdict sticky.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

/// Result of a health query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy { reason: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Empty when healthy.
    pub fn reason(&self) -> &str {
        match self {
            HealthStatus::Healthy => "",
            HealthStatus::Unhealthy { reason } => reason,
        }
    }
}

/// What processing one error did to the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Still within tolerance.
    Tolerated { count: usize },
    /// This error tripped the latch.
    Latched { reason: String },
    /// The latch had already tripped earlier.
    AlreadyLatched { count: usize },
}

/// Windowed error counter with a one-way unhealthy latch.
#[derive(Debug)]
pub struct HealthState {
    threshold: usize,
    window: Duration,
    /// `None` until the first error, which always opens a window.
    window_start: Option<Instant>,
    window_started_at: SystemTime,
    window_count: usize,
    latch: Option<String>,
}

impl HealthState {
    pub fn new(threshold: usize, window: Duration) -> Self {
        Self {
            threshold,
            window,
            window_start: None,
            window_started_at: UNIX_EPOCH,
            window_count: 0,
            latch: None,
        }
    }

    pub fn status(&self) -> HealthStatus {
        match &self.latch {
            None => HealthStatus::Healthy,
            Some(reason) => HealthStatus::Unhealthy {
                reason: reason.clone(),
            },
        }
    }

    pub fn window_count(&self) -> usize {
        self.window_count
    }

    /// Account for one non-nil error observed at `now`.
    ///
    /// `occurred_at` is the error's wall-clock stamp; a window opened by this
    /// error reports it as its start time.
    pub fn record_error(&mut self, now: Instant, occurred_at: SystemTime, cause: &dyn fmt::Display) -> Transition {
        self.window_count += 1;

        let expired = match self.window_start {
            None => true,
            Some(start) => now.saturating_duration_since(start) > self.window,
        };
        if expired && self.window_count <= self.threshold {
            self.window_start = Some(now);
            self.window_started_at = occurred_at;
            self.window_count = 1;
        }

        if self.window_count <= self.threshold {
            return Transition::Tolerated {
                count: self.window_count,
            };
        }
        if self.latch.is_some() {
            return Transition::AlreadyLatched {
                count: self.window_count,
            };
        }

        let reason = format!(
            "Too many critical errors {} in the last {:?} window started at {}, last error: {}",
            self.window_count,
            self.window,
            unix_secs(self.window_started_at),
            cause,
        );
        self.latch = Some(reason.clone());
        Transition::Latched { reason }
    }
}

fn unix_secs(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
