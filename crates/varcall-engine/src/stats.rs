//! Slow-path counters
//!
//! Atomic counters the dispatch worker bumps on every slow-path entry.
//! The fast path never touches them.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by every call site of one bridge
#[derive(Debug, Default)]
pub struct DispatchStats {
    slow_path_entries: AtomicU64,
    generations: AtomicU64,
    generation_failures: AtomicU64,
    stub_stores: AtomicU64,
    rejected_entries: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    /// Trampoline invocations that found an empty cache slot
    pub slow_path_entries: u64,
    /// Generator invocations
    pub generations: u64,
    /// Generator invocations that returned an error
    pub generation_failures: u64,
    /// Entry points published into a cache slot
    pub stub_stores: u64,
    /// Entry points rejected by validation
    pub rejected_entries: u64,
}

impl DispatchStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_slow_path(&self) -> u64 {
        self.slow_path_entries.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_generation(&self) {
        self.generations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store(&self) {
        self.stub_stores.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected_entries.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            slow_path_entries: self.slow_path_entries.load(Ordering::Relaxed),
            generations: self.generations.load(Ordering::Relaxed),
            generation_failures: self.generation_failures.load(Ordering::Relaxed),
            stub_stores: self.stub_stores.load(Ordering::Relaxed),
            rejected_entries: self.rejected_entries.load(Ordering::Relaxed),
        }
    }
}
