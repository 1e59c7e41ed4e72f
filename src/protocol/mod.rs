//! Line-oriented request protocol (component C): framing, tokenizer,
//! command dispatch, and reply formatting.

mod lexer;
mod reply;
mod request;

pub use lexer::{quote, tokenize, LexError};
pub use reply::Reply;
pub use request::{parse_line, Request, RequestError};

/// Default maximum line length. Servers may configure a different cap via
/// `settings::Settings::max_line_bytes`.
pub const DEFAULT_MAX_LINE_BYTES: usize = 8 * 1024;
