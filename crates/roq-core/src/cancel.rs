//! Cooperative cancellation for long builds
//!
//! A greedy round has no meaningful partial result, so cancellation is only
//! observed between rounds (and between scanned dimensions during the
//! search). Clone the token into whatever thread or signal handler should be
//! able to stop the build.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation at the next round boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
