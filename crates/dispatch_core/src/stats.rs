//! Dispatch counters, updated lock-free and read as a snapshot.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct DispatchStats {
    rides_requested: AtomicU64,
    rides_accepted: AtomicU64,
    rides_rejected: AtomicU64,
    rides_cancelled: AtomicU64,
    rides_completed: AtomicU64,
    accept_conflicts: AtomicU64,
    pickup_code_mismatches: AtomicU64,
    notifications_delivered: AtomicU64,
    notifications_dropped: AtomicU64,
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub rides_requested: u64,
    pub rides_accepted: u64,
    pub rides_rejected: u64,
    pub rides_cancelled: u64,
    pub rides_completed: u64,
    /// Accepts that lost the race to another driver.
    pub accept_conflicts: u64,
    pub pickup_code_mismatches: u64,
    pub notifications_delivered: u64,
    pub notifications_dropped: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl DispatchStats {
    pub fn record_requested(&self) {
        bump(&self.rides_requested);
    }

    pub fn record_accepted(&self) {
        bump(&self.rides_accepted);
    }

    pub fn record_rejected(&self) {
        bump(&self.rides_rejected);
    }

    pub fn record_cancelled(&self) {
        bump(&self.rides_cancelled);
    }

    pub fn record_completed(&self) {
        bump(&self.rides_completed);
    }

    pub fn record_accept_conflict(&self) {
        bump(&self.accept_conflicts);
    }

    pub fn record_pickup_code_mismatch(&self) {
        bump(&self.pickup_code_mismatches);
    }

    pub fn record_delivery(&self, delivered: bool) {
        if delivered {
            bump(&self.notifications_delivered);
        } else {
            bump(&self.notifications_dropped);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            rides_requested: load(&self.rides_requested),
            rides_accepted: load(&self.rides_accepted),
            rides_rejected: load(&self.rides_rejected),
            rides_cancelled: load(&self.rides_cancelled),
            rides_completed: load(&self.rides_completed),
            accept_conflicts: load(&self.accept_conflicts),
            pickup_code_mismatches: load(&self.pickup_code_mismatches),
            notifications_delivered: load(&self.notifications_delivered),
            notifications_dropped: load(&self.notifications_dropped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let stats = DispatchStats::default();
        stats.record_requested();
        stats.record_requested();
        stats.record_delivery(true);
        stats.record_delivery(false);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.rides_requested, 2);
        assert_eq!(snapshot.notifications_delivered, 1);
        assert_eq!(snapshot.notifications_dropped, 1);
        assert_eq!(snapshot.rides_completed, 0);
    }
}
