//! Dispatcher counters.
//!
//! [`DispatchStats`] is a point-in-time copy of a dispatcher's cumulative
//! counters. It exists mainly so that the at-most-one-outstanding-flush
//! property can be observed from tests and benchmarks.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a dispatcher's cumulative counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Notifications received.
    pub notifications: u64,
    /// Flush jobs handed to the scheduler.
    pub schedules: u64,
    /// Flushes started.
    pub flushes: u64,
    /// Bucket batches the view rejected.
    pub failed_batches: u64,
    /// Notifications refused because the dispatcher was closed.
    pub dropped: u64,
}

impl DispatchStats {
    /// Flushes scheduled but not yet started. Never exceeds 1.
    pub fn outstanding(&self) -> u64 {
        self.schedules.saturating_sub(self.flushes)
    }
}

#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    notifications: AtomicU64,
    schedules: AtomicU64,
    flushes: AtomicU64,
    failed_batches: AtomicU64,
    dropped: AtomicU64,
}

impl DispatchCounters {
    pub(crate) fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_schedule(&self) {
        self.schedules.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_failed_batch(&self) {
        self.failed_batches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// `schedules` is read before `flushes`, so a concurrent flush can
    /// only make `outstanding()` under-report.
    pub(crate) fn snapshot(&self) -> DispatchStats {
        let schedules = self.schedules.load(Ordering::SeqCst);
        let flushes = self.flushes.load(Ordering::SeqCst);
        DispatchStats {
            notifications: self.notifications.load(Ordering::Relaxed),
            schedules,
            flushes,
            failed_batches: self.failed_batches.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = DispatchStats::default();
        assert_eq!(s.notifications, 0);
        assert_eq!(s.outstanding(), 0);
    }

    #[test]
    fn outstanding_saturates_for_manual_flushes() {
        let s = DispatchStats {
            schedules: 2,
            flushes: 5,
            ..DispatchStats::default()
        };
        assert_eq!(s.outstanding(), 0);
    }

    #[test]
    fn snapshot_reflects_counters() {
        let c = DispatchCounters::default();
        c.record_notification();
        c.record_notification();
        c.record_schedule();
        let s = c.snapshot();
        assert_eq!(s.notifications, 2);
        assert_eq!(s.schedules, 1);
        assert_eq!(s.outstanding(), 1);
        c.record_flush();
        c.record_failed_batch();
        c.record_dropped();
        let s = c.snapshot();
        assert_eq!(s.outstanding(), 0);
        assert_eq!(s.failed_batches, 1);
        assert_eq!(s.dropped, 1);
    }
}
