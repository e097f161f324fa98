//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a shared atomic flag. The worker pool owns it and
//! flips it when a time budget elapses; the exploration driver reads it
//! between batches only, so a cancelled exploration always finishes its
//! current batch and produces coherent output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag checked at batch boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flip the flag. Idempotent; safe from any thread.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());

        token.cancel();
        assert!(other.is_cancelled());

        // cancelling twice is fine
        other.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_crosses_threads() {
        let token = CancelToken::new();
        let seen = token.clone();

        std::thread::scope(|s| {
            s.spawn(move || token.cancel());
        });

        assert!(seen.is_cancelled());
    }
}
