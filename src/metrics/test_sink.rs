//! Call-recording sink used by tests to assert on emitted metrics.

use parking_lot::Mutex;

use super::MetricsSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Increment(String),
    Gauge(String, i64),
    Timing(String, u64),
}

#[derive(Default)]
pub struct TestSink {
    calls: Mutex<Vec<Recorded>>,
}

impl TestSink {
    pub fn new() -> Self {
        TestSink::default()
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().clone()
    }

    pub fn increment_count(&self, name: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, Recorded::Increment(n) if n == name))
            .count()
    }

    pub fn last_gauge(&self, name: &str) -> Option<i64> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find_map(|c| match c {
                Recorded::Gauge(n, v) if n == name => Some(*v),
                _ => None,
            })
    }
}

impl MetricsSink for TestSink {
    fn increment(&self, name: &str) {
        self.calls.lock().push(Recorded::Increment(name.to_string()));
    }

    fn gauge(&self, name: &str, value: i64) {
        self.calls.lock().push(Recorded::Gauge(name.to_string(), value));
    }

    fn timing(&self, name: &str, millis: u64) {
        self.calls.lock().push(Recorded::Timing(name.to_string(), millis));
    }
}
