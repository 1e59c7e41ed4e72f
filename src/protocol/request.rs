//! Command dispatch: turns a tokenized line into a `Request`.

use super::lexer::{split_key_value, tokenize, LexError};
use crate::operation::Operation;

/// A parsed request line. The core defines exactly one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Hit { operation: Operation },
}

/// Why a line failed to parse into a `Request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// First token is not a recognized command.
    UnknownCommand { verb: String },
    /// Lex or argument-grammar failure.
    Malformed { message: String },
}

impl RequestError {
    /// The wire error `kind` token for this failure.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::UnknownCommand { .. } => "unknown-command",
            RequestError::Malformed { .. } => "unknown",
        }
    }

    pub fn message(&self) -> String {
        match self {
            RequestError::UnknownCommand { verb } => {
                format!("Unrecognized command: {}", verb)
            }
            RequestError::Malformed { message } => message.clone(),
        }
    }
}

/// Parse one newline-stripped line into a `Request`.
pub fn parse_line(line: &str) -> Result<Request, RequestError> {
    let tokens = tokenize(line).map_err(lex_error_to_request_error)?;
    let mut tokens = tokens.into_iter();
    let verb = tokens.next().unwrap_or_default();

    match verb.to_ascii_uppercase().as_str() {
        "HIT" => {
            let mut operation = Operation::empty();
            for token in tokens {
                let (key, value) = split_key_value(&token).map_err(lex_error_to_request_error)?;
                operation.set(key, value);
            }
            Ok(Request::Hit { operation })
        }
        _ => Err(RequestError::UnknownCommand { verb }),
    }
}

fn lex_error_to_request_error(e: LexError) -> RequestError {
    RequestError::Malformed { message: e.message() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hit_with_labels() {
        let req = parse_line("HIT method=GET path=/ping ip=1.2.3.4").unwrap();
        match req {
            Request::Hit { operation } => {
                assert_eq!(operation.lookup("method"), "GET");
                assert_eq!(operation.lookup("path"), "/ping");
                assert_eq!(operation.lookup("ip"), "1.2.3.4");
            }
        }
    }

    #[test]
    fn command_is_case_insensitive() {
        assert!(matches!(parse_line("hit method=GET").unwrap(), Request::Hit { .. }));
        assert!(matches!(parse_line("Hit method=GET").unwrap(), Request::Hit { .. }));
    }

    #[test]
    fn unknown_command_is_reported_with_original_casing() {
        let err = parse_line("EGGPLANT foo").unwrap_err();
        assert_eq!(err.kind(), "unknown-command");
        assert_eq!(err.message(), "Unrecognized command: EGGPLANT");
    }

    #[test]
    fn bad_quoting_is_unknown_kind() {
        let err = parse_line(r#"HIT "quoteme=123"#).unwrap_err();
        assert_eq!(err.kind(), "unknown");
        assert_eq!(err.message(), "Unexpected end of quoted string.");
    }

    #[test]
    fn argument_without_equals_is_a_lex_error() {
        let err = parse_line("HIT method").unwrap_err();
        assert_eq!(err.kind(), "unknown");
    }

    #[test]
    fn repeated_key_keeps_last_value() {
        let req = parse_line("HIT method=GET method=POST").unwrap();
        match req {
            Request::Hit { operation } => assert_eq!(operation.lookup("method"), "POST"),
        }
    }

    #[test]
    fn empty_hit_is_the_empty_operation() {
        let req = parse_line("HIT").unwrap();
        match req {
            Request::Hit { operation } => assert!(operation.is_empty()),
        }
    }
}
