//! The metrics sink contract and its implementations.

mod tracing_sink;
#[cfg(feature = "dogstatsd")]
mod dogstatsd_sink;
mod test_sink;

pub use tracing_sink::TracingMetrics;
#[cfg(feature = "dogstatsd")]
pub use dogstatsd_sink::DogStatsdMetrics;
pub use test_sink::TestSink;

/// Counter/gauge/timer interface injected into the server. Written from
/// every connection task — implementations must be safe for concurrent use.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, name: &str);
    fn gauge(&self, name: &str, value: i64);
    fn timing(&self, name: &str, millis: u64);
}

/// How an operation was matched: `Default` iff the matched rule's operation
/// is empty, `Rule` otherwise, `None` iff no rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Rule,
    Default,
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Rule => "rule",
            MatchType::Default => "default",
            MatchType::None => "none",
        }
    }
}
