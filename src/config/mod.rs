//! Config loading and the rule table (component A) plus the rule matcher
//! (component B).

mod loader;
mod pattern;
mod rule;

pub use loader::{load_rule_table, parse_rule_table, ConfigError};
pub use pattern::Pattern;
pub use rule::{Rule, RuleTable, RuleTableError};
