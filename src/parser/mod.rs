//! Front-end for the lock-annotation language
//!
//! This module handles lexical analysis and parsing of `.lkl` files into the
//! program representation the analyzer consumes.

pub mod lexer;
pub mod parser;
pub mod error;
pub mod span;

pub use lexer::Lexer;
pub use parser::Parser;
pub use error::{ParseError, ParseResult};
pub use span::{Span, Location, HasSpan};

use crate::ast::Program;
use crate::error::Result;

/// Parse a `.lkl` source file into a program
pub fn parse_program(source: &str) -> Result<Program> {
    parser::parse(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_program() {
        let source = r#"
lock a level 2;
var counter guarded by a;

proc bump() {
    locks (a) {
        counter = counter + 1;
    }
}

counter = 0;
"#;

        let program = parse_program(source).expect("Failed to parse");
        assert_eq!(program.routines().count(), 1);
        assert_eq!(program.top_level().len(), 1);
    }
}
