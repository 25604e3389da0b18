use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative "restart the current transfer" request.
///
/// Raised from outside the transfer (a signal handler task, the interactive
/// prompt) and consumed by the transfer loop at its checkpoints. Consuming
/// clears it, so one request aborts exactly one attempt.
#[derive(Debug, Clone, Default)]
pub struct RestartFlag(Arc<AtomicBool>);

impl RestartFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns whether a restart was requested and clears the request.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}
