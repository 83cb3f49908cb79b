use std::sync::{Mutex, MutexGuard, PoisonError};

/// Process-lifetime query counters owned by one orchestrator.
///
/// Count and total time are updated together under one lock so a snapshot never observes a
/// count without its matching duration.
#[derive(Debug, Default)]
pub struct RunningStatistics {
    inner: Mutex<Totals>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    query_count: u64,
    total_query_time_ms: f64,
}

impl RunningStatistics {
    /// Create an empty statistics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed query attempt and its elapsed wall time.
    pub fn record_query(&self, elapsed_ms: f64) {
        let mut totals = self.lock();
        totals.query_count += 1;
        totals.total_query_time_ms += elapsed_ms.max(0.0);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let totals = *self.lock();
        StatisticsSnapshot {
            query_count: totals.query_count,
            total_query_time_ms: totals.total_query_time_ms,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Totals> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Immutable view of the query counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    /// Number of query attempts recorded since startup.
    pub query_count: u64,
    /// Sum of elapsed wall time across recorded attempts.
    pub total_query_time_ms: f64,
}

impl StatisticsSnapshot {
    /// Mean query time, or zero when nothing has been recorded yet.
    pub fn average_query_time_ms(&self) -> f64 {
        if self.query_count == 0 {
            0.0
        } else {
            self.total_query_time_ms / self.query_count as f64
        }
    }
}
