//! Global atomic counters.
//!
//! Counters are bumped silently at the call site; [`Metrics::flush`] emits
//! the current values as one `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    components_computed: AtomicU64,
    runs_completed: AtomicU64,
    runs_cancelled: AtomicU64,
    runs_failed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            components_computed: AtomicU64::new(0),
            runs_completed: AtomicU64::new(0),
            runs_cancelled: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
        }
    }

    /// One tensor component finished.
    pub fn inc_components(&self) {
        self.components_computed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_completed", "counter incremented");
    }

    pub fn inc_cancelled(&self) {
        self.runs_cancelled.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_cancelled", "counter incremented");
    }

    pub fn inc_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_failed", "counter incremented");
    }

    /// Emit all counters as a single `info!` event, typically at the end of a run.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            components_computed = self.components_computed(),
            runs_completed = self.runs_completed(),
            runs_cancelled = self.runs_cancelled(),
            runs_failed = self.runs_failed(),
        );
    }

    pub fn components_computed(&self) -> u64 {
        self.components_computed.load(Ordering::Relaxed)
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }

    pub fn runs_cancelled(&self) -> u64 {
        self.runs_cancelled.load(Ordering::Relaxed)
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.components_computed.store(0, Ordering::Relaxed);
        self.runs_completed.store(0, Ordering::Relaxed);
        self.runs_cancelled.store(0, Ordering::Relaxed);
        self.runs_failed.store(0, Ordering::Relaxed);
    }
}
