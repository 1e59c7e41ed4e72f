//! Rules and the ordered rule table.

use super::pattern::Pattern;
use crate::operation::Operation;

/// An immutable rule: a family of operations matched by pattern, plus the
/// credit budget and partitioning that governs that family.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Declared label patterns, in section-header order. A rule only tests
    /// the labels it declares here; everything else in an operation is
    /// ignored.
    pub operation: Vec<(String, Pattern)>,
    pub credit_limit: u64,
    pub reset_seconds: u64,
    pub actor_field: Option<String>,
    pub comment: Option<String>,
}

impl Rule {
    /// Does every label this rule declares match the corresponding label in
    /// `op` (missing treated as empty string)?
    pub fn matches(&self, op: &Operation) -> bool {
        self.operation
            .iter()
            .all(|(key, pattern)| pattern.matches(op.lookup(key)))
    }

    /// True when this rule's declared operation is empty — the default,
    /// catch-all rule.
    pub fn is_default(&self) -> bool {
        self.operation.is_empty()
    }

    /// Re-derive a concrete operation from this rule's own patterns, used as
    /// the unreachable-rule probe: it includes only the labels this rule
    /// declares.
    pub fn self_probe(&self) -> Operation {
        self.operation
            .iter()
            .map(|(k, p)| (k.clone(), p.probe_value().to_string()))
            .collect()
    }

    /// A stable string identifying this rule's shape, reconstructed from its
    /// declared patterns (e.g. `method=GET path=/ping* ip=*`, or `default`
    /// for the catch-all rule). Used as the bucket-key discriminator so two
    /// rules with different shapes but identical projections never collide.
    pub fn discriminator(&self) -> String {
        if self.operation.is_empty() {
            return "default".to_string();
        }
        self.operation
            .iter()
            .map(|(k, p)| format!("{}={}", k, pattern_source(p)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn pattern_source(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Exact(v) => v.clone(),
        Pattern::Any => "*".to_string(),
        Pattern::Prefix(p) => format!("{}*", p),
    }
}

/// Why a candidate rule was rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTableError {
    /// An earlier rule at `masked_by` already matches every operation the
    /// candidate would match.
    UnreachableRule { masked_by: usize },
}

impl std::fmt::Display for RuleTableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleTableError::UnreachableRule { masked_by } => {
                write!(f, "rule is unreachable: masked by rule at position {}", masked_by)
            }
        }
    }
}

impl std::error::Error for RuleTableError {}

/// An ordered, append-only table of rules. Precedence is positional:
/// `find_rule` returns the first match. Immutable once built — after
/// construction the table is wrapped in `Arc` and shared read-only across
/// connection tasks.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new() -> Self {
        RuleTable { rules: Vec::new() }
    }

    /// Append a rule, rejecting it if it could never be reached.
    ///
    /// The default/catch-all rule (empty declared operation) always has the
    /// lowest precedence regardless of where it appears in the document: it
    /// is only ever consulted once every non-default rule has failed to
    /// match, exactly mirroring `find_rule`'s resolution order. So a default
    /// rule can only mask (or be masked by) another default rule, never a
    /// specific one; and a specific rule is only checked against earlier
    /// specific rules.
    pub fn add_rule(&mut self, rule: Rule) -> Result<(), RuleTableError> {
        if rule.is_default() {
            if let Some(index) = self.rules.iter().position(|r| r.is_default()) {
                return Err(RuleTableError::UnreachableRule { masked_by: index });
            }
        } else {
            let probe = rule.self_probe();
            let masked_by = self
                .rules
                .iter()
                .position(|r| !r.is_default() && r.matches(&probe));
            if let Some(index) = masked_by {
                return Err(RuleTableError::UnreachableRule { masked_by: index });
            }
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Resolve an operation to its governing rule, or `None` if nothing
    /// matches. Specific rules are tried first, in document order; the
    /// default rule (if any) is only consulted once none of them match,
    /// regardless of where it was declared.
    pub fn find_rule(&self, op: &Operation) -> Option<&Rule> {
        self.rules
            .iter()
            .filter(|rule| !rule.is_default())
            .find(|rule| rule.matches(op))
            .or_else(|| self.rules.iter().find(|rule| rule.is_default()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact_rule(pairs: &[(&str, &str)], credit: u64) -> Rule {
        Rule {
            operation: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Pattern::parse(v)))
                .collect(),
            credit_limit: credit,
            reset_seconds: 60,
            actor_field: None,
            comment: None,
        }
    }

    /// The last appended rule always self-matches, so long as it isn't
    /// actually subsumed by an earlier one.
    #[test]
    fn self_match_after_append() {
        let mut table = RuleTable::new();
        table.add_rule(exact_rule(&[("method", "POST")], 10)).unwrap();
        let r = exact_rule(&[("method", "GET"), ("path", "/ping*")], 20);
        table.add_rule(r.clone()).unwrap();
        let found = table.find_rule(&r.self_probe()).unwrap();
        assert_eq!(found.credit_limit, 20);
    }

    /// Appending a rule already matched by an earlier one fails.
    #[test]
    fn masked_rule_is_rejected() {
        let mut table = RuleTable::new();
        table.add_rule(exact_rule(&[("method", "*")], 10)).unwrap();
        let err = table.add_rule(exact_rule(&[("method", "GET")], 20)).unwrap_err();
        assert_eq!(err, RuleTableError::UnreachableRule { masked_by: 0 });
    }

    /// A rule that genuinely is a stricter version of an earlier one (same
    /// declared label, a pattern that matches a subset of what the earlier
    /// rule accepts) is rejected: `[method=GET]` already matches every
    /// operation `[method=GET path=/ping*]` would, since it never looks at
    /// `path` at all.
    #[test]
    fn rule_adding_a_label_to_an_already_covered_one_is_rejected() {
        let mut table = RuleTable::new();
        table.add_rule(exact_rule(&[("method", "GET")], 10)).unwrap();
        let err = table
            .add_rule(exact_rule(&[("method", "GET"), ("path", "/ping*")], 20))
            .unwrap_err();
        assert_eq!(err, RuleTableError::UnreachableRule { masked_by: 0 });
    }

    /// The self-probe check only ever tests one representative value per
    /// label, so it can miss rules that are reachable for most inputs but
    /// shadowed for a few: `[a=foo]` doesn't happen to match `[a=f* b=bar]`'s
    /// own probe value (`"f"`), even though an operation with `a=foo` would
    /// match both (and resolve to the earlier, narrower rule).
    #[test]
    fn narrower_rule_with_extra_labels_is_not_caught() {
        let mut table = RuleTable::new();
        table.add_rule(exact_rule(&[("a", "foo")], 10)).unwrap();
        assert!(table.add_rule(exact_rule(&[("a", "f*"), ("b", "bar")], 20)).is_ok());
    }

    #[test]
    fn default_rule_matches_everything() {
        let mut table = RuleTable::new();
        table.add_rule(exact_rule(&[("method", "GET")], 10)).unwrap();
        table
            .add_rule(Rule {
                operation: Vec::new(),
                credit_limit: 5,
                reset_seconds: 60,
                actor_field: None,
                comment: None,
            })
            .unwrap();

        let op = Operation::from_pairs(vec![("method".to_string(), "DELETE".to_string())]);
        let found = table.find_rule(&op).unwrap();
        assert!(found.is_default());
        assert_eq!(found.credit_limit, 5);
    }

    /// A default declared before a specific rule doesn't shadow it: the
    /// default rule's precedence is always lowest, independent of where it
    /// was appended.
    #[test]
    fn default_declared_first_does_not_mask_a_later_specific_rule() {
        let mut table = RuleTable::new();
        table
            .add_rule(Rule {
                operation: Vec::new(),
                credit_limit: 10,
                reset_seconds: 60,
                actor_field: None,
                comment: None,
            })
            .unwrap();
        table.add_rule(exact_rule(&[("method", "GET")], 100)).unwrap();

        let matched = Operation::from_pairs(vec![("method".to_string(), "GET".to_string())]);
        let found = table.find_rule(&matched).unwrap();
        assert!(!found.is_default());
        assert_eq!(found.credit_limit, 100);

        let fallback = Operation::from_pairs(vec![("method".to_string(), "DELETE".to_string())]);
        let found = table.find_rule(&fallback).unwrap();
        assert!(found.is_default());
        assert_eq!(found.credit_limit, 10);
    }

    #[test]
    fn unmatched_operation_returns_none_without_default() {
        let mut table = RuleTable::new();
        table.add_rule(exact_rule(&[("method", "GET")], 10)).unwrap();
        let op = Operation::from_pairs(vec![("method".to_string(), "DELETE".to_string())]);
        assert!(table.find_rule(&op).is_none());
    }

    #[test]
    fn rule_ignores_undeclared_labels() {
        let mut table = RuleTable::new();
        table.add_rule(exact_rule(&[("method", "GET")], 10)).unwrap();
        let op = Operation::from_pairs(vec![
            ("method".to_string(), "GET".to_string()),
            ("isAuthenticated".to_string(), "bloop".to_string()),
        ]);
        assert!(table.find_rule(&op).is_some());
    }
}
