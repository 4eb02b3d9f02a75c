use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of the scheduler counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Entries accepted into the intake queue.
    pub submitted: u64,
    /// Submissions discarded because the data flow was closed.
    pub dropped: u64,
    pub actions: u64,
    pub flows: u64,
    pub events: u64,
    /// States written to the store (including recovered and terminal ones).
    pub applied: u64,
    pub recovered: u64,
    pub escalated: u64,
}

/// Shared counters; submitters and the drain loop bump them concurrently.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub submitted: AtomicU64,
    pub dropped: AtomicU64,
    pub actions: AtomicU64,
    pub flows: AtomicU64,
    pub events: AtomicU64,
    pub applied: AtomicU64,
    pub recovered: AtomicU64,
    pub escalated: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            actions: self.actions.load(Ordering::Relaxed),
            flows: self.flows.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            recovered: self.recovered.load(Ordering::Relaxed),
            escalated: self.escalated.load(Ordering::Relaxed),
        }
    }
}
