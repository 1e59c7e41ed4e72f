//! Tokenizer and quoting for the line protocol.
//!
//! A line is whitespace-separated tokens; a token is either a bareword or a
//! double-quoted string with `\"`/`\\` escapes (any other `\x` de-quotes to
//! plain `x`).

/// A lex-time failure. The message text is part of the wire contract (it is
/// echoed verbatim in `ERR unknown "..."` replies), so it is reproduced
/// exactly rather than phrased freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnterminatedQuote,
    MissingEquals { token: String },
}

impl LexError {
    pub fn message(&self) -> String {
        match self {
            LexError::UnterminatedQuote => "Unexpected end of quoted string.".to_string(),
            LexError::MissingEquals { token } => {
                format!("Expected key=value, got '{}'.", token)
            }
        }
    }
}

/// Split a line into whitespace-separated tokens, de-quoting any
/// double-quoted token as it goes.
pub fn tokenize(line: &str) -> Result<Vec<String>, LexError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        if chars.peek() == Some(&'"') {
            chars.next();
            let mut token = String::new();
            loop {
                match chars.next() {
                    None => return Err(LexError::UnterminatedQuote),
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        None => return Err(LexError::UnterminatedQuote),
                        Some(c) => token.push(c),
                    },
                    Some(c) => token.push(c),
                }
            }
            tokens.push(token);
        } else {
            let mut token = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '"' {
                    break;
                }
                token.push(c);
                chars.next();
            }
            tokens.push(token);
        }
    }

    Ok(tokens)
}

/// Quote a string for a reply line, using the same escape rules the lexer
/// accepts: `"` becomes `\"` and `\` becomes `\\`.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Split a `key=value` argument token into its parts. The value half may
/// itself have been a quoted string already de-quoted by `tokenize`.
pub fn split_key_value(token: &str) -> Result<(String, String), LexError> {
    match token.split_once('=') {
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(LexError::MissingEquals {
            token: token.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_barewords() {
        assert_eq!(
            tokenize("HIT method=GET path=/ping").unwrap(),
            vec!["HIT", "method=GET", "path=/ping"]
        );
    }

    #[test]
    fn tokenizes_quoted_strings_with_spaces() {
        assert_eq!(
            tokenize(r#"HIT comment="ping throttle""#).unwrap(),
            vec!["HIT", r#"comment=ping throttle"#]
        );
    }

    #[test]
    fn quote_escapes_survive_round_trip() {
        let original = r#"say "hi" \ bye"#;
        let quoted = quote(original);
        let tokens = tokenize(&quoted).unwrap();
        assert_eq!(tokens, vec![original.to_string()]);
    }

    #[test]
    fn unterminated_quote_is_a_lex_error() {
        let err = tokenize(r#"HIT "quoteme=123"#).unwrap_err();
        assert_eq!(err, LexError::UnterminatedQuote);
        assert_eq!(err.message(), "Unexpected end of quoted string.");
    }

    #[test]
    fn quoted_escape_of_other_char_is_literal() {
        assert_eq!(tokenize(r#""a\nb""#).unwrap(), vec!["anb".to_string()]);
    }

    #[test]
    fn missing_equals_is_a_lex_error() {
        assert_eq!(
            split_key_value("method").unwrap_err(),
            LexError::MissingEquals {
                token: "method".to_string()
            }
        );
    }

    #[test]
    fn trailing_equals_is_empty_value() {
        assert_eq!(
            split_key_value("method=").unwrap(),
            ("method".to_string(), String::new())
        );
    }

    /// Token round trip for label-legal values.
    #[test]
    fn token_round_trip() {
        for value in ["GET", "", "has space", "has\"quote", "back\\slash"] {
            let line = format!("HIT key={}", quote(value));
            let tokens = tokenize(&line).unwrap();
            let (_, parsed_value) = split_key_value(&tokens[1]).unwrap();
            assert_eq!(parsed_value, value);
        }
    }
}
