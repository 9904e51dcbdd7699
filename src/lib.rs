//! Lock-level analyzer (locklevel)
//!
//! A static checker for lock annotations: every access to a guarded location
//! must sit inside a critical section holding its guard, and nested critical
//! sections must acquire locks in strictly decreasing level order.
//!
//! ## Architecture
//!
//! - **parser**: Lexical analysis and parsing of `.lkl` sources into the AST
//! - **ast**: Program representation (declarations, routines, statements)
//! - **analysis**: Path model, guard registry, level table, context stack,
//!   ordering rules, effect inference and the two-phase driver
//! - **config**: Analyzer settings
//! - **bin**: Command-line interface
//!
//! ## Analysis Flow
//!
//! ```text
//! .lkl source → Parser → AST → Phase 1 (declarations) → Effect inference
//!                                      ↓
//!                     Phase 2 (routine bodies, top level) → Report
//! ```

pub mod analysis;
pub mod ast;
pub mod config;
pub mod error;
pub mod parser;

pub use analysis::{Diagnostic, ErrorKind, Report};
pub use config::Config;
pub use error::{Error, Result};

use std::path::Path;

/// Analyze an already-parsed program.
pub fn analyze(program: &ast::Program, config: &Config) -> Report {
    analysis::check_program(program, config)
}

/// Parse and analyze `.lkl` source text.
pub fn analyze_source(source: &str, config: &Config) -> Result<Report> {
    config.validate()?;
    log::debug!("parsing {} byte(s) of source", source.len());
    let program = parser::parse_program(source)?;
    Ok(analyze(&program, config))
}

/// Read, parse and analyze one `.lkl` file.
pub fn analyze_file(path: impl AsRef<Path>, config: &Config) -> Result<Report> {
    let path = path.as_ref();
    let display = path.display().to_string();
    log::debug!("analyzing {}", display);
    let source = std::fs::read_to_string(path).map_err(|e| Error::from(e).in_file(display.as_str()))?;
    analyze_source(&source, config).map_err(|e| e.in_file(display))
}
