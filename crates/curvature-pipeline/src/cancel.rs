//! Cooperative cancellation shared between foreground and worker.
//!
//! The foreground owns a [`CancelHandle`] and may only raise the flag; the
//! worker holds a [`CancelToken`] and may only read it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Read-only view handed to the worker.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            flag: Arc::clone(&self.flag),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_observes_cancel() {
        let handle = CancelHandle::new();
        let token = handle.token();
        assert!(!token.is_cancelled());
        handle.cancel();
        handle.cancel();
        assert!(token.is_cancelled());
        assert!(handle.clone().is_cancelled());
    }
}
