//! Cancellation token for aborting a turn

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Shared cancel flag
///
/// Clones observe the same flag. The CLI hands one clone to the orchestrator
/// and trips another from its Ctrl-C handler; providers poll it between
/// chunks.
#[derive(Clone, Default)]
pub struct CancellationToken {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    tripped: AtomicBool,
    waiters: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.tripped.load(Ordering::SeqCst)
    }

    /// Trip the flag and wake every waiter; later calls do nothing
    pub fn cancel(&self) {
        if !self.shared.tripped.swap(true, Ordering::SeqCst) {
            self.shared.waiters.notify_waiters();
        }
    }

    /// Resolve once the token is cancelled
    pub async fn cancelled(&self) {
        // Enable the waiter before reading the flag, otherwise a concurrent
        // cancel() can slip in between and never wake us.
        let mut wake = std::pin::pin!(self.shared.waiters.notified());
        wake.as_mut().enable();

        if !self.is_cancelled() {
            wake.await;
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CancellationToken({})", if self.is_cancelled() { "cancelled" } else { "live" })
    }
}
