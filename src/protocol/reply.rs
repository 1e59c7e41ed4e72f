//! Reply formatting.

use super::lexer::quote;

/// A reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok {
        allowed: bool,
        credit: i64,
        reset_seconds: u64,
    },
    Err {
        kind: String,
        message: String,
    },
}

impl Reply {
    pub fn ok(allowed: bool, credit: i64, reset_seconds: u64) -> Reply {
        Reply::Ok {
            allowed,
            credit,
            reset_seconds,
        }
    }

    pub fn err(kind: impl Into<String>, message: impl Into<String>) -> Reply {
        Reply::Err {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Render the reply as a single LF-terminated wire line.
    pub fn encode(&self) -> String {
        match self {
            Reply::Ok {
                allowed,
                credit,
                reset_seconds,
            } => format!("OK {} {} {}\n", allowed, credit, reset_seconds),
            Reply::Err { kind, message } => format!("ERR {} {}\n", kind, quote(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_ok_reply() {
        assert_eq!(Reply::ok(true, 100, 60).encode(), "OK true 100 60\n");
    }

    #[test]
    fn encodes_err_reply_with_quoted_message() {
        let reply = Reply::err("unknown-command", "Unrecognized command: EGGPLANT");
        assert_eq!(
            reply.encode(),
            "ERR unknown-command \"Unrecognized command: EGGPLANT\"\n"
        );
    }

    #[test]
    fn quotes_message_containing_quotes() {
        let reply = Reply::err("unknown", r#"bad "token""#);
        assert_eq!(reply.encode(), "ERR unknown \"bad \\\"token\\\"\"\n");
    }

    #[test]
    fn negative_sentinel_credit_is_encoded_as_is() {
        assert_eq!(Reply::ok(true, -1, 0).encode(), "OK true -1 0\n");
    }
}
