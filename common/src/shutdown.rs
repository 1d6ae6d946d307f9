// Cooperative shutdown coordination
//
// Shared by the poll worker and the scheduled job runner. The request flag
// is observed only at natural suspension boundaries (tick start, timer
// firing); in-flight work is never preempted.

use tokio::sync::watch;
use tracing::debug;

/// Drain signal with a once-only completion notification.
pub struct ShutdownCoordinator {
    request_tx: watch::Sender<bool>,
    done_tx: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (request_tx, _) = watch::channel(false);
        let (done_tx, _) = watch::channel(false);
        Self {
            request_tx,
            done_tx,
        }
    }

    /// Request a drain. Idempotent; the first call wins.
    pub fn request_shutdown(&self) {
        let changed = self.request_tx.send_if_modified(|requested| {
            if *requested {
                false
            } else {
                *requested = true;
                true
            }
        });
        if changed {
            debug!("Shutdown requested");
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.request_tx.borrow()
    }

    /// Receiver for waking idle timer waits when a drain is requested.
    pub fn request_watcher(&self) -> watch::Receiver<bool> {
        self.request_tx.subscribe()
    }

    /// Fire the completion signal. Fires exactly once; later calls are
    /// no-ops.
    pub fn signal_complete(&self) {
        let fired = self.done_tx.send_if_modified(|done| {
            if *done {
                false
            } else {
                *done = true;
                true
            }
        });
        if fired {
            debug!("Completion signaled");
        }
    }

    pub fn is_complete(&self) -> bool {
        *self.done_tx.borrow()
    }

    /// Resolves once the completion signal has fired, including when it
    /// fired before this call.
    pub async fn wait_complete(&self) {
        let mut rx = self.done_tx.subscribe();
        if *rx.borrow_and_update() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
