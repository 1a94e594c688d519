//! Cooperative cancellation handle.
//!
//! Stands in for the "ctx" parameter referenced throughout the engine design:
//! a cheap, cloneable signal checked at well-defined suspension points. It
//! carries no deadline and no value bag — only a cancel flag — since timeouts
//! and request-scoped values are a caller concern outside this crate's scope.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A cancellation signal shared between a caller and the engine loop it drives.
///
/// Cloning a `Cancellation` shares the same underlying flag; cancelling any
/// clone cancels all of them.
#[derive(Clone)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl Cancellation {
    /// A handle that is never cancelled; the default for callers with no
    /// cancellation needs.
    pub fn none() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Resolves once `cancel()` has been called on this handle or a clone of it.
    /// Suspension points that can usefully wait rather than poll use this;
    /// the engine's iteration-boundary check uses `is_cancelled()` directly.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        let c = Cancellation::none();
        assert!(!c.is_cancelled());
    }

    #[test]
    fn cancel_is_visible_on_clones() {
        let c = Cancellation::none();
        let clone = c.clone();
        c.cancel();
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let c = Cancellation::none();
        let waiter = c.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        c.cancel();
        handle.await.unwrap();
    }
}
