//! Cooperative cancellation flag
//!
//! Shared between the caller (CLI signal handler, API request scope) and
//! long-running operations: bulk imports and update-all check it between
//! batches, fetch callbacks check it mid-transfer. Cancellation is a
//! request, not an abort; work already committed stands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}
