//! Error channel between producers and the health listener.
//!
//! # Responsibilities
//! - Stamp every reported error with its arrival time
//! - Hand each event to exactly one consumer, in FIFO order
//! - Apply backpressure when the buffer is full
//!
//! # Design Decisions
//! - Capacity 0 is a rendezvous: the producer waits until the listener has
//!   finished processing its event, so the verdict already reflects it
//! - Reporting a `None` cause is accepted and ignored downstream

use std::fmt;
use std::time::SystemTime;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::BoxError;

/// An application error together with the time it was reported.
#[derive(Debug)]
pub struct ErrorEvent {
    pub cause: Option<BoxError>,
    pub occurred_at: SystemTime,
}

impl ErrorEvent {
    fn now(cause: Option<BoxError>) -> Self {
        Self {
            cause,
            occurred_at: SystemTime::now(),
        }
    }
}

/// Failure to hand an error to the listener.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("error listener is no longer running")]
    Closed,

    #[error("error channel is full")]
    Full,
}

pub(crate) struct Envelope {
    pub(crate) event: ErrorEvent,
    pub(crate) ack: Option<oneshot::Sender<()>>,
}

/// Producer side of the error channel. Clone it for every producer.
#[derive(Clone)]
pub struct ErrorReporter {
    tx: mpsc::Sender<Envelope>,
    handoff: bool,
}

/// Consumer side of the error channel, owned by the listener.
pub struct ErrorReceiver {
    rx: mpsc::Receiver<Envelope>,
}

/// Create a bounded error channel.
///
/// `capacity == 0` makes every report wait for the listener to process it.
pub fn error_channel(capacity: usize) -> (ErrorReporter, ErrorReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        ErrorReporter {
            tx,
            handoff: capacity == 0,
        },
        ErrorReceiver { rx },
    )
}

impl ErrorReporter {
    /// Report an application error.
    pub async fn report<E: Into<BoxError>>(&self, err: E) -> Result<(), ReportError> {
        self.report_opt(Some(err.into())).await
    }

    /// Report an optional error; `None` is delivered but never counted.
    pub async fn report_opt(&self, err: Option<BoxError>) -> Result<(), ReportError> {
        let (envelope, ack) = self.envelope(err);
        self.tx.send(envelope).await.map_err(|_| ReportError::Closed)?;
        if let Some(ack) = ack {
            // A dropped ack means the listener went away mid-flight.
            ack.await.map_err(|_| ReportError::Closed)?;
        }
        Ok(())
    }

    /// Report from a thread that is not driven by the Tokio runtime.
    ///
    /// Panics if called from within an async context, like every Tokio
    /// `blocking_*` method.
    pub fn blocking_report<E: Into<BoxError>>(&self, err: E) -> Result<(), ReportError> {
        let (envelope, ack) = self.envelope(Some(err.into()));
        self.tx.blocking_send(envelope).map_err(|_| ReportError::Closed)?;
        if let Some(ack) = ack {
            ack.blocking_recv().map_err(|_| ReportError::Closed)?;
        }
        Ok(())
    }

    /// Report without waiting.
    ///
    /// With a rendezvous channel the event is queued but processing is not awaited.
    pub fn try_report<E: Into<BoxError>>(&self, err: E) -> Result<(), ReportError> {
        let envelope = Envelope {
            event: ErrorEvent::now(Some(err.into())),
            ack: None,
        };
        self.tx.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ReportError::Full,
            mpsc::error::TrySendError::Closed(_) => ReportError::Closed,
        })
    }

    fn envelope(&self, err: Option<BoxError>) -> (Envelope, Option<oneshot::Receiver<()>>) {
        let (ack_tx, ack_rx) = if self.handoff {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        (
            Envelope {
                event: ErrorEvent::now(err),
                ack: ack_tx,
            },
            ack_rx,
        )
    }
}

impl fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("handoff", &self.handoff)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl ErrorReceiver {
    pub(crate) async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }
}
