//! Label patterns: the closed, three-variant match language rules are built from.

/// A single label pattern, derived from one `key=value` token in a section
/// header.
///
/// There is no regex engine behind this: `Prefix` is a plain `starts_with`
/// check. A bare `*` is never represented as `Prefix("")` — it collapses to
/// `Any` at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Literal match against the label value.
    Exact(String),
    /// Matches any value, including a missing label.
    Any,
    /// Matches values whose string representation begins with the prefix.
    Prefix(String),
}

impl Pattern {
    /// Derive a pattern from a section-header label value, per spec:
    /// a trailing `*` makes it a prefix pattern unless the whole value is
    /// `*`, in which case it is `Any`.
    pub fn parse(value: &str) -> Pattern {
        if value == "*" {
            return Pattern::Any;
        }
        match value.strip_suffix('*') {
            Some(prefix) => Pattern::Prefix(prefix.to_string()),
            None => Pattern::Exact(value.to_string()),
        }
    }

    /// Test this pattern against an observed label value. A missing label is
    /// represented by the caller passing `""`.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Exact(v) => v == value,
            Pattern::Any => true,
            Pattern::Prefix(p) => value.starts_with(p.as_str()),
        }
    }

    /// The literal value a `find_rule` probe should use when re-deriving a
    /// concrete operation from this pattern (used by the unreachable-rule
    /// check and by operation projection).
    pub fn probe_value(&self) -> &str {
        match self {
            Pattern::Exact(v) => v,
            Pattern::Any => "*",
            Pattern::Prefix(p) => p,
        }
    }
}
