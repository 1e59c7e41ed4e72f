//! Default metrics sink: emits through `tracing` so any subscriber or
//! exporter the operator wires up gets metrics for free, while keeping
//! in-process atomic counters so the values are queryable without a
//! collector attached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::Mutex;
use tracing::info;

use super::MetricsSink;

/// A `MetricsSink` that logs every call at `info` level and keeps a running
/// tally per counter/gauge name, queryable via `snapshot`.
pub struct TracingMetrics {
    counters: Mutex<HashMap<String, AtomicI64>>,
}

impl TracingMetrics {
    pub fn new() -> Self {
        TracingMetrics {
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Current value of a counter or gauge, or 0 if it has never been
    /// touched.
    pub fn snapshot(&self, name: &str) -> i64 {
        self.counters
            .lock()
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn bump(&self, name: &str, delta: i64) {
        let mut counters = self.counters.lock();
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(delta, Ordering::Relaxed);
    }

    fn set(&self, name: &str, value: i64) {
        let mut counters = self.counters.lock();
        counters
            .entry(name.to_string())
            .or_insert_with(|| AtomicI64::new(0))
            .store(value, Ordering::Relaxed);
    }
}

impl Default for TracingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSink for TracingMetrics {
    fn increment(&self, name: &str) {
        self.bump(name, 1);
        info!(metric = name, "increment");
    }

    fn gauge(&self, name: &str, value: i64) {
        self.set(name, value);
        info!(metric = name, value, "gauge");
    }

    fn timing(&self, name: &str, millis: u64) {
        info!(metric = name, millis, "timing");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_accumulates() {
        let sink = TracingMetrics::new();
        sink.increment("hit.accepted");
        sink.increment("hit.accepted");
        assert_eq!(sink.snapshot("hit.accepted"), 2);
    }

    #[test]
    fn gauge_overwrites() {
        let sink = TracingMetrics::new();
        sink.gauge("connections", 3);
        sink.gauge("connections", 1);
        assert_eq!(sink.snapshot("connections"), 1);
    }
}
