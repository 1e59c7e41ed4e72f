//! divvy: a network-accessible rate-limit decision service.
//!
//! A client describes an operation as a bag of key=value labels over a
//! line-oriented TCP protocol; the service matches it against a declarative
//! rule table and answers with an allow/deny decision, remaining credit, and
//! time to refill.

pub mod backend;
pub mod config;
pub mod hit;
pub mod key;
pub mod metrics;
pub mod operation;
pub mod protocol;
pub mod server;
pub mod settings;

pub use config::{ConfigError, Pattern, Rule, RuleTable};
pub use hit::{BackendFailurePolicy, HitHandler};
pub use operation::Operation;
pub use settings::Settings;
