//! The hit handler (component E): joins the rule matcher, the bucket-key
//! derivation, the backend, and metrics emission for one parsed `HIT`.

use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use crate::backend::Backend;
use crate::config::{Pattern, RuleTable};
use crate::key::bucket_key;
use crate::metrics::{MatchType, MetricsSink};
use crate::operation::Operation;
use crate::protocol::Reply;

/// Credit reported back for an operation that matched no rule at all: allow
/// it, and signal "uncounted" with a negative credit rather than a real
/// remaining balance.
pub const UNMATCHED_SENTINEL_CREDIT: i64 = -1;

/// Whether the handler allows or denies the request when the backend call
/// itself fails. Fail-open is the default; fail-closed is a configurable
/// toggle for deployments that would rather reject traffic than risk letting
/// an outage erase rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailurePolicy {
    FailOpen,
    FailClosed,
}

pub struct HitHandler {
    rules: Arc<RuleTable>,
    backend: Arc<dyn Backend>,
    metrics: Arc<dyn MetricsSink>,
    failure_policy: BackendFailurePolicy,
}

impl HitHandler {
    pub fn new(
        rules: Arc<RuleTable>,
        backend: Arc<dyn Backend>,
        metrics: Arc<dyn MetricsSink>,
        failure_policy: BackendFailurePolicy,
    ) -> Self {
        HitHandler {
            rules,
            backend,
            metrics,
            failure_policy,
        }
    }

    /// Handle one parsed operation end to end and produce the reply to
    /// write back to the client.
    pub async fn handle(&self, operation: &Operation) -> Reply {
        let started = Instant::now();

        let rule = match self.rules.find_rule(operation) {
            Some(rule) => rule,
            None => {
                self.metrics.increment("hit.accepted");
                self.metrics.increment("hit.accepted.none");
                self.metrics
                    .timing("hit", started.elapsed().as_millis() as u64);
                return Reply::ok(true, UNMATCHED_SENTINEL_CREDIT, 0);
            }
        };

        let match_type = if rule.is_default() {
            MatchType::Default
        } else {
            MatchType::Rule
        };

        let projected = project(operation, rule);
        let actor = rule
            .actor_field
            .as_deref()
            .map(|field| operation.lookup(field))
            .unwrap_or("");

        let key = bucket_key(&projected, actor, &rule.discriminator());

        let reply = match self.backend.hit(&key, rule.credit_limit, rule.reset_seconds).await {
            Ok(outcome) => {
                if outcome.allowed {
                    self.metrics.increment("hit.accepted");
                    self.metrics
                        .increment(&format!("hit.accepted.{}", match_type.as_str()));
                } else {
                    self.metrics.increment("hit.rejected");
                    self.metrics
                        .increment(&format!("hit.rejected.{}", match_type.as_str()));
                }
                Reply::ok(outcome.allowed, outcome.remaining as i64, outcome.reset_seconds)
            }
            Err(e) => {
                warn!(error = %e, "backend call failed, applying fail-open/fail-closed policy");
                self.metrics.increment("error.backend-unavailable");
                match self.failure_policy {
                    BackendFailurePolicy::FailOpen => Reply::ok(true, 0, 0),
                    BackendFailurePolicy::FailClosed => Reply::ok(false, 0, 0),
                }
            }
        };

        self.metrics
            .timing("hit", started.elapsed().as_millis() as u64);
        reply
    }
}

/// Project an operation down to the labels the matched rule declares,
/// substituting `*` for any label whose pattern is `Any`.
pub fn project(op: &Operation, rule: &crate::config::Rule) -> Operation {
    rule.operation
        .iter()
        .map(|(key, pattern)| {
            let value = match pattern {
                Pattern::Any => "*".to_string(),
                _ => op.lookup(key).to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}
