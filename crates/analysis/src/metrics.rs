use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one analysis run, shared with its poll task.
#[derive(Default)]
pub struct PollMetrics {
    ticks: AtomicU64,
    ok_responses: AtomicU64,
    not_found_responses: AtomicU64,
    transient_failures: AtomicU64,
    partial_updates: AtomicU64,
    stale_writes_discarded: AtomicU64,
}

impl PollMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ok(&self) {
        self.ok_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transient_failure(&self) {
        self.transient_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_partial_update(&self) {
        self.partial_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_write(&self) {
        self.stale_writes_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PollMetricsSnapshot {
        PollMetricsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            ok_responses: self.ok_responses.load(Ordering::Relaxed),
            not_found_responses: self.not_found_responses.load(Ordering::Relaxed),
            transient_failures: self.transient_failures.load(Ordering::Relaxed),
            partial_updates: self.partial_updates.load(Ordering::Relaxed),
            stale_writes_discarded: self.stale_writes_discarded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollMetricsSnapshot {
    pub ticks: u64,
    pub ok_responses: u64,
    pub not_found_responses: u64,
    pub transient_failures: u64,
    pub partial_updates: u64,
    pub stale_writes_discarded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = PollMetrics::new();
        metrics.record_tick();
        metrics.record_tick();
        metrics.record_not_found();
        metrics.record_ok();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks, 2);
        assert_eq!(snapshot.not_found_responses, 1);
        assert_eq!(snapshot.ok_responses, 1);
        assert_eq!(snapshot.transient_failures, 0);
    }
}
