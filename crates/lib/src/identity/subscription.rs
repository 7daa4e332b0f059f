//! Identity change subscription handle.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::task::JoinHandle;

/// The single active subscription to identity changes.
///
/// Dropping the handle, or calling [`unsubscribe`](Self::unsubscribe), stops
/// delivery and frees the slot so a new subscriber can be registered. Since
/// `unsubscribe` consumes the handle it can only run once.
#[must_use = "dropping the subscription immediately unsubscribes"]
#[derive(Debug)]
pub struct IdentitySubscription {
    task: JoinHandle<()>,
    slot: Arc<AtomicBool>,
}

impl IdentitySubscription {
    pub(crate) fn new(task: JoinHandle<()>, slot: Arc<AtomicBool>) -> Self {
        Self { task, slot }
    }

    /// Stop receiving identity changes.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }

    /// Whether the event loop is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for IdentitySubscription {
    fn drop(&mut self) {
        self.task.abort();
        self.slot.store(false, Ordering::SeqCst);
        tracing::debug!("Identity subscription closed");
    }
}
