//! Cleaner Statistics Module
//!
//! Tracks scheduler activity: evictions, resets and sweep passes.

use serde::Serialize;

// == Cleaner Stats ==
/// Counters describing what the expiration scheduler has done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanerStats {
    /// Entries removed when their timer fired
    pub timer_evictions: u64,
    /// Entries removed during a sweep without waiting (already expired)
    pub immediate_evictions: u64,
    /// Waits canceled because the watched key was re-inserted
    pub resets: u64,
    /// Sweep passes started
    pub sweeps: u64,
    /// Entries whose expiration timestamp could not be read
    pub invalid_expiries: u64,
    /// Current number of entries in the container
    pub total_entries: usize,
}

impl CleanerStats {
    // == Constructor ==
    /// Creates a new CleanerStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Total Evictions ==
    /// Entries removed by the scheduler, by either path.
    pub fn total_evictions(&self) -> u64 {
        self.timer_evictions + self.immediate_evictions
    }

    pub fn record_timer_eviction(&mut self) {
        self.timer_evictions += 1;
    }

    pub fn record_immediate_eviction(&mut self) {
        self.immediate_evictions += 1;
    }

    pub fn record_reset(&mut self) {
        self.resets += 1;
    }

    pub fn record_sweep(&mut self) {
        self.sweeps += 1;
    }

    pub fn record_invalid_expiry(&mut self) {
        self.invalid_expiries += 1;
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
