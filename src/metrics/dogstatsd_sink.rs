//! Optional DogStatsD-backed sink, configured through the same `DD_*`
//! environment variable convention used elsewhere in this codebase.

use dogstatsd::{Client, Options};
use tracing::warn;

use super::MetricsSink;

pub struct DogStatsdMetrics {
    client: Client,
    tags: Vec<String>,
}

impl DogStatsdMetrics {
    /// Build a sink from the `DD_DOGSTATSD_URL`/`DD_TAGS` environment
    /// variables.
    pub fn from_env() -> Self {
        let statsd_addr =
            std::env::var("DD_DOGSTATSD_URL").unwrap_or_else(|_| "127.0.0.1:8125".to_string());
        let options = Options::new("0.0.0.0:0", &statsd_addr, "divvy");
        let client = Client::new(options).expect("dogstatsd client must bind a local socket");
        let tags = std::env::var("DD_TAGS")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        DogStatsdMetrics { client, tags }
    }
}

impl MetricsSink for DogStatsdMetrics {
    fn increment(&self, name: &str) {
        if let Err(e) = self.client.incr(name, self.tags.clone()) {
            warn!(metric = name, error = %e, "failed to emit counter to dogstatsd");
        }
    }

    fn gauge(&self, name: &str, value: i64) {
        if let Err(e) = self.client.gauge(name, value.to_string(), self.tags.clone()) {
            warn!(metric = name, error = %e, "failed to emit gauge to dogstatsd");
        }
    }

    fn timing(&self, name: &str, millis: u64) {
        if let Err(e) = self.client.timing(name, millis as i64, self.tags.clone()) {
            warn!(metric = name, error = %e, "failed to emit timing to dogstatsd");
        }
    }
}
