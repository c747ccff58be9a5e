//! Drain signal for the HTTP host.
//!
//! The process owns one [`Shutdown`]; the host's serve loop holds a
//! receiver and begins draining when it fires, after which the hosted
//! application is stopped through its context-destroyed callback.

use tokio::sync::broadcast;

/// Fan-out of a single "stop serving" event.
///
/// Firing is idempotent and never fails: with no receiver left there is
/// nothing to drain.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver for [`crate::http::HttpServer::run`] or any task that must
    /// wind down with the host.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscriber to drain.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Subscribers that have not yet dropped their receiver.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
