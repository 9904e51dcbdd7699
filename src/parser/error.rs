use super::lexer::LexError;
use crate::ast::Location;
use crate::error::Error;
use thiserror::Error as ThisError;

/// Why a `.lkl` source could not be turned into a program.
///
/// The rendered message carries no position; [`ParseError::location`] does,
/// and the conversion into [`Error`] attaches it.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        location: Location,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEndOfInput { expected: String, location: Location },

    #[error("unexpected character `{text}`")]
    UnexpectedCharacter { text: String, location: Location },

    #[error("integer `{literal}` is out of range")]
    IntegerOutOfRange { literal: String, location: Location },

    /// `locks ()` or `enter ;`
    #[error("critical section needs at least one lock")]
    EmptyLockList { location: Location },

    /// `(f)(x)`, `a.b(x)` and friends
    #[error("only named routines can be called")]
    CallThroughPath { location: Location },

    /// Expressions and blocks share one nesting budget
    #[error("expression or block nested too deeply (limit is {limit})")]
    NestedTooDeeply { limit: usize, location: Location },
}

impl ParseError {
    pub fn unexpected_token(expected: &str, found: &str, location: Location) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            location,
        }
    }

    pub fn unexpected_end_of_input(expected: &str, location: Location) -> Self {
        ParseError::UnexpectedEndOfInput {
            expected: expected.to_string(),
            location,
        }
    }

    /// Where the parser stopped
    pub fn location(&self) -> Location {
        match self {
            ParseError::UnexpectedToken { location, .. }
            | ParseError::UnexpectedEndOfInput { location, .. }
            | ParseError::UnexpectedCharacter { location, .. }
            | ParseError::IntegerOutOfRange { location, .. }
            | ParseError::EmptyLockList { location }
            | ParseError::CallThroughPath { location }
            | ParseError::NestedTooDeeply { location, .. } => *location,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(error: LexError) -> Self {
        ParseError::UnexpectedCharacter {
            text: error.text,
            location: error.location,
        }
    }
}

impl From<ParseError> for Error {
    fn from(parse_error: ParseError) -> Self {
        let location = parse_error.location();
        let message = parse_error.to_string();
        match parse_error {
            ParseError::UnexpectedCharacter { .. } => Error::Lexical {
                line: location.line,
                column: location.column,
                message,
            },
            _ => Error::parse_error(location.line, location.column, message),
        }
    }
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stray_characters_become_lexical_errors() {
        let err: Error = ParseError::UnexpectedCharacter {
            text: "@".to_string(),
            location: Location::new(3, 7, 20),
        }
        .into();
        assert!(matches!(err, Error::Lexical { line: 3, column: 7, .. }), "{err}");
        assert!(err.to_string().contains("`@`"), "{err}");
    }

    #[test]
    fn nesting_limit_is_a_parse_error() {
        let err: Error = ParseError::NestedTooDeeply { limit: 8, location: Location::start() }.into();
        assert!(matches!(err, Error::Parse { line: 1, column: 1, .. }), "{err}");
        assert!(err.to_string().contains("nested too deeply (limit is 8)"), "{err}");
    }
}
