//! Cooperative cancellation: a root token owned by the orchestrator,
//! cloned into every worker, scheduler tick and collaborator call.

use tokio::sync::watch;

/// Sending side, held by the machine. Dropping it does not cancel;
/// `cancel()` must be called explicitly (`Machine::stop`).
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

/// Cloneable token observed by workers and collaborators.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelSource {
    pub fn new() -> (CancelSource, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelSource { tx }, CancelToken { rx })
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation is requested. Safe to use inside
    /// `tokio::select!` arms.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        while !*rx.borrow() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
