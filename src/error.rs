use thiserror::Error;

/// Result type for locklevel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failures that stop the analyzer from producing a report at all.
///
/// Violations found in the analyzed program are not errors in this sense;
/// they are reported as [`crate::analysis::Diagnostic`]s.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Lexical error at line {line}, column {column}: {message}")]
    Lexical {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{path}: {source}")]
    InFile {
        path: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a parse error with location information
    pub fn parse_error(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Attach the file the error came from
    pub fn in_file(self, path: impl Into<String>) -> Self {
        Self::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }
}
