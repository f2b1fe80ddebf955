use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// One increment per classified message. `Persisted`/`PersistFailed` are only
/// known after the write attempt completes, so accepted samples are tallied
/// once the outcome of the insert is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    BelowRange,
    AboveRange,
    IgnoredStation,
    Persisted,
    PersistFailed,
}

/// Running totals for one stream session. Zeroed on session start and on
/// stop; within a session every counter is monotonically non-decreasing and
/// `total` always equals the sum of the outcome counters.
#[derive(Debug, Default)]
pub struct SessionCounters {
    below_range: AtomicU64,
    above_range: AtomicU64,
    ignored_station: AtomicU64,
    persisted: AtomicU64,
    persist_failed: AtomicU64,
    total: AtomicU64,
}

impl SessionCounters {
    pub fn record(&self, tally: Tally) {
        let slot = match tally {
            Tally::BelowRange => &self.below_range,
            Tally::AboveRange => &self.above_range,
            Tally::IgnoredStation => &self.ignored_station,
            Tally::Persisted => &self.persisted,
            Tally::PersistFailed => &self.persist_failed,
        };
        slot.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.below_range.store(0, Ordering::Relaxed);
        self.above_range.store(0, Ordering::Relaxed);
        self.ignored_station.store(0, Ordering::Relaxed);
        self.persisted.store(0, Ordering::Relaxed);
        self.persist_failed.store(0, Ordering::Relaxed);
        self.total.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            below_range: self.below_range.load(Ordering::Relaxed),
            above_range: self.above_range.load(Ordering::Relaxed),
            ignored_station: self.ignored_station.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            persist_failed: self.persist_failed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub below_range: u64,
    pub above_range: u64,
    pub ignored_station: u64,
    pub persisted: u64,
    pub persist_failed: u64,
    pub total: u64,
}

impl CountersSnapshot {
    pub fn outcome_sum(&self) -> u64 {
        self.below_range
            + self.above_range
            + self.ignored_station
            + self.persisted
            + self.persist_failed
    }
}
