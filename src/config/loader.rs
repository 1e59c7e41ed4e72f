//! INI config loading: turns a config document into a `RuleTable`.
//!
//! ```text
//! [default]
//! creditLimit = 10
//! resetSeconds = 60
//!
//! [method=GET path=/ping* ip=*]
//! creditLimit = 100
//! resetSeconds = 60
//! actorField = ip
//! comment = ping throttle
//! ```

use std::fs;
use std::path::Path;

use ini::Ini;

use super::pattern::Pattern;
use super::rule::{Rule, RuleTable, RuleTableError};

/// Errors building a `RuleTable` from an INI document. Startup-fatal: the
/// caller maps these to exit code 1.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read.
    Io { path: String, source: std::io::Error },
    /// The document is not well-formed INI.
    Parse { path: String, reason: String },
    /// A rule is unreachable: an earlier rule already matches everything it
    /// would match.
    UnreachableRule {
        section: String,
        masked_by: usize,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config '{}': {}", path, source)
            }
            ConfigError::Parse { path, reason } => {
                write!(f, "failed to parse config '{}': {}", path, reason)
            }
            ConfigError::UnreachableRule { section, masked_by } => {
                write!(
                    f,
                    "rule '[{}]' is unreachable: masked by rule at position {}",
                    section, masked_by
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Load a rule table from a config file on disk.
pub fn load_rule_table(path: impl AsRef<Path>) -> Result<RuleTable, ConfigError> {
    let path = path.as_ref();
    let path_str = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path_str.clone(),
        source: e,
    })?;
    parse_rule_table(&text, &path_str)
}

/// Parse a rule table from an in-memory INI document. `source_name` is only
/// used to annotate error messages.
pub fn parse_rule_table(text: &str, source_name: &str) -> Result<RuleTable, ConfigError> {
    let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse {
        path: source_name.to_string(),
        reason: e.to_string(),
    })?;

    let mut table = RuleTable::new();
    for (section, props) in ini.iter() {
        let header = match section {
            Some(header) => header,
            // Properties that appear before any `[section]` header don't
            // correspond to a rule; the document has no top-level keys in
            // this dialect.
            None => continue,
        };

        let operation = parse_section_header(header);

        let credit_limit = props
            .get("creditLimit")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let reset_seconds = props
            .get("resetSeconds")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        let actor_field = props
            .get("actorField")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let comment = props.get("comment").map(|v| v.trim().to_string());

        let rule = Rule {
            operation,
            credit_limit,
            reset_seconds,
            actor_field,
            comment,
        };

        table.add_rule(rule).map_err(|e| match e {
            RuleTableError::UnreachableRule { masked_by } => ConfigError::UnreachableRule {
                section: header.to_string(),
                masked_by,
            },
        })?;
    }

    Ok(table)
}

/// Parse a section header into the rule's declared label patterns.
///
/// Grammar: either the literal token `default` (empty operation), or one or
/// more whitespace-separated `key=value` tokens. A token with no `=` is a
/// key with empty-string value; a trailing `=` also yields an empty value.
fn parse_section_header(header: &str) -> Vec<(String, Pattern)> {
    let header = header.trim();
    if header == "default" {
        return Vec::new();
    }

    header
        .split_whitespace()
        .map(|token| {
            let mut parts = token.splitn(2, '=');
            let key = parts.next().unwrap_or("").to_string();
            let value = parts.next().unwrap_or("");
            (key, Pattern::parse(value))
        })
        .collect()
}
