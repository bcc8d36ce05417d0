//! Cancellation registry for the in-flight job.
//!
//! One watch channel per job: the processor registers a fresh token when
//! it picks up a job, subprocess runners subscribe to it, and anyone may
//! fire it. Firing twice is a no-op because the sender is taken on the
//! first cancel.

use std::sync::Mutex;

use tokio::sync::watch;
use tracing::debug;

/// Process-wide cancellation registry.
#[derive(Default)]
pub struct CancelRegistry {
    current: Mutex<Option<watch::Sender<bool>>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a token for the job that is about to run and return the
    /// receiver subprocess runners watch.
    pub fn register(&self) -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        let mut guard = self.lock();
        *guard = Some(tx);
        rx
    }

    /// Fire the current token. Returns whether a token was armed.
    pub fn cancel(&self) -> bool {
        let Some(tx) = self.lock().take() else {
            return false;
        };
        debug!("cancellation token fired");
        // Receivers still observe the pending change after the sender drops.
        let _ = tx.send(true);
        true
    }

    /// Drop the token when its job finishes.
    pub fn clear(&self) {
        let _ = self.lock().take();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<watch::Sender<bool>>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_cancel() {
        let registry = CancelRegistry::new();
        let rx = registry.register();
        assert!(!*rx.borrow());
        assert!(registry.cancel());
        assert!(*rx.borrow());
    }

    #[test]
    fn test_double_cancel_is_noop() {
        let registry = CancelRegistry::new();
        let _rx = registry.register();
        assert!(registry.cancel());
        assert!(!registry.cancel());
    }

    #[test]
    fn test_cancel_without_job() {
        let registry = CancelRegistry::new();
        assert!(!registry.cancel());
    }

    #[test]
    fn test_new_job_gets_fresh_token() {
        let registry = CancelRegistry::new();
        let _old = registry.register();
        registry.cancel();
        let rx = registry.register();
        assert!(!*rx.borrow());
    }
}
