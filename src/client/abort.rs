use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use super::error::ClientError;

/// Cancels every client operation it is passed to. Clones share state.
#[derive(Debug, Clone)]
pub struct AbortToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for AbortToken {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `abort` has been called.
    pub async fn aborted(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on abort.
        let _ = rx.wait_for(|aborted| *aborted).await;
    }

    /// Drives `fut` unless the token is aborted first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ClientError> {
        tokio::select! {
            biased;
            _ = self.aborted() => Err(ClientError::Aborted),
            out = fut => Ok(out),
        }
    }
}
