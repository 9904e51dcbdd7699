//! Program representation consumed by the analyzer.
//!
//! The analyzer only interprets a handful of shapes: guard and level
//! declarations, routine signatures, critical-section brackets, plain access
//! expressions and calls. Everything else is carried through opaquely.

mod nodes;
mod printer;

pub use nodes::*;

pub use crate::parser::span::{HasSpan, Location, Span};
