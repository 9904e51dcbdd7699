//! Location paths and syntactic path equivalence.
//!
//! Equality here is deliberately token-based: `a[i].v` and `a[i + 0].v` are
//! different paths, and so are `a[i].v` before and after `i` is reassigned.
//! Anything smarter belongs behind [`PathEquivalence`].
//!
//! [`paths_equal`] is plain token equality and so a full equivalence
//! relation. Lock matching through [`Syntactic`] narrows it: an opaque path
//! names no particular lock, so it matches nothing, not even itself.

use crate::ast::Expr;
use std::fmt;

/// One step of a location path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Symbol(String),
    Field(String),
    /// Unevaluated token form of the index expression
    Index(String),
    Deref,
}

/// Canonical form of an access expression.
///
/// An opaque path stands for an expression shape the model does not cover
/// (calls, arithmetic). All opaque paths are equal to one another, but none
/// of them ever matches a lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationPath {
    segments: Vec<Segment>,
    opaque: bool,
}

impl LocationPath {
    pub fn symbol(name: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Symbol(name.into())],
            opaque: false,
        }
    }

    pub fn opaque() -> Self {
        Self {
            segments: Vec::new(),
            opaque: true,
        }
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.push(Segment::Field(name.into()));
        self
    }

    pub fn index(mut self, token: impl Into<String>) -> Self {
        self.push(Segment::Index(token.into()));
        self
    }

    pub fn deref(mut self) -> Self {
        self.push(Segment::Deref);
        self
    }

    fn push(&mut self, segment: Segment) {
        if !self.opaque {
            self.segments.push(segment);
        }
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Every non-empty prefix, shortest first, ending with the path itself.
    /// Reading `a.b.c` also reads `a.b` and `a`.
    pub fn prefixes(&self) -> impl Iterator<Item = LocationPath> + '_ {
        (1..=self.segments.len()).map(move |n| LocationPath {
            segments: self.segments[..n].to_vec(),
            opaque: false,
        })
    }
}

impl fmt::Display for LocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opaque {
            return f.write_str("<opaque>");
        }
        for segment in &self.segments {
            match segment {
                Segment::Symbol(name) => write!(f, "{}", name)?,
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Index(token) => write!(f, "[{}]", token)?,
                Segment::Deref => f.write_str("^")?,
            }
        }
        Ok(())
    }
}

/// Convert an access expression into its location path.
pub fn canonicalize(expr: &Expr) -> LocationPath {
    match expr {
        Expr::Ident(e) => LocationPath::symbol(e.name.as_str()),
        Expr::Field(e) => canonicalize(&e.target).field(e.name.as_str()),
        Expr::Index(e) => canonicalize(&e.target).index(e.index.to_string()),
        Expr::Deref(e) => canonicalize(&e.target).deref(),
        Expr::Literal(_) | Expr::Call(_) | Expr::Unary(_) | Expr::Binary(_) => LocationPath::opaque(),
    }
}

/// Decides whether two lock paths denote the same lock
pub trait PathEquivalence {
    fn equivalent(&self, a: &LocationPath, b: &LocationPath) -> bool;
}

/// Token-sequence equality over non-opaque paths
#[derive(Debug, Clone, Copy, Default)]
pub struct Syntactic;

impl PathEquivalence for Syntactic {
    fn equivalent(&self, a: &LocationPath, b: &LocationPath) -> bool {
        !a.opaque && !b.opaque && paths_equal(a, b)
    }
}

/// Token-sequence equality. Reflexive, symmetric and transitive on every
/// path, opaque ones included.
pub fn paths_equal(a: &LocationPath, b: &LocationPath) -> bool {
    a.opaque == b.opaque && a.segments == b.segments
}
