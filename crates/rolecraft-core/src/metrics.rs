//! Per-engine atomic counters.
//!
//! Counters are incremented silently at the call site. Call
//! [`EngineMetrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. after startup composition).

use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight atomic counters. No allocations, no locking.
#[derive(Debug)]
pub struct EngineMetrics {
    merges_executed: AtomicU64,
    compositions_failed: AtomicU64,
    conflicts_detected: AtomicU64,
    candidates_vetoed: AtomicU64,
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub const fn new() -> Self {
        Self {
            merges_executed: AtomicU64::new(0),
            compositions_failed: AtomicU64::new(0),
            conflicts_detected: AtomicU64::new(0),
            candidates_vetoed: AtomicU64::new(0),
        }
    }

    /// One execution of the merge algorithm started.
    pub fn inc_merges(&self) {
        self.merges_executed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "merges_executed", "counter incremented");
    }

    pub fn inc_failures(&self) {
        self.compositions_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "compositions_failed", "counter incremented");
    }

    pub fn add_conflicts(&self, n: u64) {
        self.conflicts_detected.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_vetoed(&self, n: u64) {
        self.candidates_vetoed.fetch_add(n, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            merges_executed = self.merges_executed(),
            compositions_failed = self.compositions_failed(),
            conflicts_detected = self.conflicts_detected(),
            candidates_vetoed = self.candidates_vetoed(),
        );
    }

    pub fn merges_executed(&self) -> u64 {
        self.merges_executed.load(Ordering::Relaxed)
    }

    pub fn compositions_failed(&self) -> u64 {
        self.compositions_failed.load(Ordering::Relaxed)
    }

    pub fn conflicts_detected(&self) -> u64 {
        self.conflicts_detected.load(Ordering::Relaxed)
    }

    pub fn candidates_vetoed(&self) -> u64 {
        self.candidates_vetoed.load(Ordering::Relaxed)
    }
}
