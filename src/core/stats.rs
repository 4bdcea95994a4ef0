//! Publisher statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::core::execution::CycleSummary;

/// Snapshot of publisher activity since creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerStats {
    /// Endpoints currently registered.
    pub registered_endpoints: u64,
    /// Cycles that passed the guard and started.
    pub cycles_started: u64,
    /// Cycles that received records and committed them.
    pub cycles_busy: u64,
    /// Cycles that found no records.
    pub cycles_idle: u64,
    /// Cycles aborted by a data-provider failure or panic.
    pub cycles_failed: u64,
    /// Ticks abandoned because a cycle for the endpoint was in flight.
    pub contended_ticks: u64,
    /// Statuses handed to `commit`.
    pub records_committed: u64,
    /// `OK` statuses committed.
    pub records_ok: u64,
    /// `ERROR` statuses committed.
    pub records_error: u64,
    /// `SKIPPED` statuses committed.
    pub records_skipped: u64,
}

/// Internal counters for publisher statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct ListenerCounters {
    pub registered_endpoints: AtomicU64,
    pub cycles_started: AtomicU64,
    pub cycles_busy: AtomicU64,
    pub cycles_idle: AtomicU64,
    pub cycles_failed: AtomicU64,
    pub contended_ticks: AtomicU64,
    pub records_ok: AtomicU64,
    pub records_error: AtomicU64,
    pub records_skipped: AtomicU64,
}

impl ListenerCounters {
    /// Account for a committed cycle.
    pub fn record_summary(&self, summary: &CycleSummary) {
        self.cycles_busy.fetch_add(1, Ordering::Relaxed);
        self.records_ok.fetch_add(summary.ok as u64, Ordering::Relaxed);
        self.records_error
            .fetch_add(summary.error as u64, Ordering::Relaxed);
        self.records_skipped
            .fetch_add(summary.skipped as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> ListenerStats {
        let records_ok = self.records_ok.load(Ordering::Relaxed);
        let records_error = self.records_error.load(Ordering::Relaxed);
        let records_skipped = self.records_skipped.load(Ordering::Relaxed);
        ListenerStats {
            registered_endpoints: self.registered_endpoints.load(Ordering::Relaxed),
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            cycles_busy: self.cycles_busy.load(Ordering::Relaxed),
            cycles_idle: self.cycles_idle.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            contended_ticks: self.contended_ticks.load(Ordering::Relaxed),
            records_committed: records_ok + records_error + records_skipped,
            records_ok,
            records_error,
            records_skipped,
        }
    }
}
