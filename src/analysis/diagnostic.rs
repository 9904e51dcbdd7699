use crate::ast::Span;
use super::levels::LockLevel;
use std::collections::BTreeMap;
use std::fmt;

/// A violation found in the analyzed program.
///
/// Paths are carried pre-rendered so diagnostics stay cheap to clone and
/// compare.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("location '{location}' already has a guard")]
    DuplicateGuard { location: String },
    #[error("lock level {level} for '{lock}' is outside [0, 1000]")]
    InvalidLevel { lock: String, level: i64 },
    #[error("lock level for '{lock}' is declared more than once")]
    DuplicateLevel { lock: String },
    #[error("lock '{lock}' has no declared level")]
    UndeclaredLevel { lock: String },
    #[error("access to '{location}' requires holding '{guard}'")]
    UnguardedAccess { location: String, guard: String },
    #[error("locks acquired together must share one level: '{first}' is at level {first_level}, '{other}' at level {other_level}")]
    MixedLevelFrame { first: String, first_level: LockLevel, other: String, other_level: LockLevel },
    #[error("cannot acquire '{lock}' (level {level}) while holding '{held}' (level {held_level}); levels must strictly decrease")]
    LockOrderViolation { lock: String, level: LockLevel, held: String, held_level: LockLevel },
    #[error("call to '{callee}' (effect {effect}) while holding '{held}' (level {held_level}); callee effect must be strictly lower")]
    CallOrderViolation { callee: String, effect: LockLevel, held: String, held_level: LockLevel },
    #[error("routine '{routine}' acquires up to level {inferred} but declares effect {declared}")]
    EffectMismatch { routine: String, inferred: LockLevel, declared: LockLevel },
    #[error("routine '{routine}' (effect {routine_effect}) is not a subtype of slot '{slot}' (effect {slot_effect})")]
    SlotMismatch { slot: String, slot_effect: LockLevel, routine: String, routine_effect: LockLevel },
    #[error("unbalanced critical section: {reason}")]
    UnbalancedSection { reason: String },
    #[error("call to unknown routine '{name}'")]
    UnknownRoutine { name: String },
    #[error("routine '{name}' is declared more than once")]
    DuplicateRoutine { name: String },
    #[error("unknown routine slot '{name}'")]
    UnknownSlot { name: String },
    #[error("'{text}' is not a location path")]
    OpaquePath { text: String },
}

/// Coarse classification of a [`LockError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    DuplicateGuard,
    InvalidLevel,
    DuplicateLevel,
    UndeclaredLevel,
    UnguardedAccess,
    MixedLevelFrame,
    LockOrderViolation,
    EffectMismatch,
    UnbalancedSection,
    UnknownRoutine,
    DuplicateRoutine,
    UnknownSlot,
    OpaquePath,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DuplicateGuard => "DuplicateGuardError",
            ErrorKind::InvalidLevel => "InvalidLevelError",
            ErrorKind::DuplicateLevel => "DuplicateLevelError",
            ErrorKind::UndeclaredLevel => "UndeclaredLevelError",
            ErrorKind::UnguardedAccess => "UnguardedAccessError",
            ErrorKind::MixedLevelFrame => "MixedLevelFrameError",
            ErrorKind::LockOrderViolation => "LockOrderViolationError",
            ErrorKind::EffectMismatch => "EffectMismatchError",
            ErrorKind::UnbalancedSection => "UnbalancedSectionError",
            ErrorKind::UnknownRoutine => "UnknownRoutineError",
            ErrorKind::DuplicateRoutine => "DuplicateRoutineError",
            ErrorKind::UnknownSlot => "UnknownSlotError",
            ErrorKind::OpaquePath => "OpaquePathError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LockError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LockError::DuplicateGuard { .. } => ErrorKind::DuplicateGuard,
            LockError::InvalidLevel { .. } => ErrorKind::InvalidLevel,
            LockError::DuplicateLevel { .. } => ErrorKind::DuplicateLevel,
            LockError::UndeclaredLevel { .. } => ErrorKind::UndeclaredLevel,
            LockError::UnguardedAccess { .. } => ErrorKind::UnguardedAccess,
            LockError::MixedLevelFrame { .. } => ErrorKind::MixedLevelFrame,
            LockError::LockOrderViolation { .. } | LockError::CallOrderViolation { .. } => {
                ErrorKind::LockOrderViolation
            }
            LockError::EffectMismatch { .. } | LockError::SlotMismatch { .. } => ErrorKind::EffectMismatch,
            LockError::UnbalancedSection { .. } => ErrorKind::UnbalancedSection,
            LockError::UnknownRoutine { .. } => ErrorKind::UnknownRoutine,
            LockError::DuplicateRoutine { .. } => ErrorKind::DuplicateRoutine,
            LockError::UnknownSlot { .. } => ErrorKind::UnknownSlot,
            LockError::OpaquePath { .. } => ErrorKind::OpaquePath,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            LockError::UnknownRoutine { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Where a diagnostic was raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Phase-1 declaration collection
    Declarations,
    Routine(String),
    TopLevel,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Declarations => f.write_str("declarations"),
            Scope::Routine(name) => write!(f, "proc {}", name),
            Scope::TopLevel => f.write_str("top level"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub error: LockError,
    pub span: Span,
    pub scope: Scope,
}

impl Diagnostic {
    pub fn new(error: LockError, span: Span, scope: Scope) -> Self {
        Self { error, span, scope }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn severity(&self) -> Severity {
        self.error.severity()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity() {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}] {} ({}): {}", severity, self.kind(), self.span, self.scope, self.error)
    }
}

/// Effect facts for one routine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutineEffect {
    pub inferred: LockLevel,
    pub declared: Option<LockLevel>,
}

impl RoutineEffect {
    /// The effect callers see: the declared bound if present, else the inferred one
    pub fn signature(&self) -> LockLevel {
        self.declared.unwrap_or(self.inferred)
    }
}

/// Final output of an analysis run
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
    pub effects: BTreeMap<String, RoutineEffect>,
}

impl Report {
    /// No error-severity diagnostics
    pub fn is_clean(&self) -> bool {
        self.diagnostics.iter().all(|d| !d.is_error())
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn kinds(&self) -> Vec<ErrorKind> {
        self.diagnostics.iter().map(Diagnostic::kind).collect()
    }

    pub fn has(&self, kind: ErrorKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind() == kind)
    }

    pub fn effect_of(&self, routine: &str) -> Option<LockLevel> {
        self.effects.get(routine).map(RoutineEffect::signature)
    }
}
