//! Cooperative cancellation (§5: "every long-running operation accepts an
//! optional cancellation signal ... returns a distinguished `Cancelled`
//! error at the next suspension point"). A plain atomic flag, checked by the
//! caller at loop iterations and I/O boundaries — no async runtime, matching
//! the teacher's sync-first core crates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared, cloneable flag a caller can set from another thread (or drop
/// without ever setting) to ask a long-running operation to stop early.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled_and_latches_once_set() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
