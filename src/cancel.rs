use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-way stop latch shared between the controller, the timer and the worker.
///
/// Clones observe the same flag. Once signaled it stays signaled; a new
/// session gets a new token.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Safe to call any number of times from any thread.
    pub fn signal(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Non-blocking poll of the flag
    pub fn is_signaled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
