//! Shutdown coordination for the sidecar.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Hands out broadcast receivers to the error listener and to the transport
/// servers; a single `trigger` stops all of them.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    ///
    /// Triggering with no live subscribers is not an error.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of receivers that have not been dropped yet.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once the receiver observes a shutdown, or once the coordinator is gone.
pub async fn wait(mut rx: broadcast::Receiver<()>) {
    // Lagged, Closed and Ok all mean the same thing here.
    let _ = rx.recv().await;
}
