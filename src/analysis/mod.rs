//! Guard and lock-level analysis.
//!
//! The analyzer decides, without running anything, that every access to a
//! guarded location happens inside a critical section holding its guard, and
//! that nested critical sections acquire locks in strictly decreasing level
//! order.

pub mod checker;
pub mod context;
pub mod diagnostic;
pub mod effects;
pub mod guards;
pub mod levels;
pub mod ordering;
pub mod path;

pub use checker::{check_program, Checker, Declarations};
pub use context::{ActiveLockSet, ContextStack, Frame, FrameScope, HeldLock};
pub use diagnostic::{Diagnostic, ErrorKind, LockError, Report, RoutineEffect, Scope, Severity};
pub use effects::{EffectInferer, RoutineType};
pub use guards::{GuardDescriptor, GuardRegistry, ProgramPoint};
pub use levels::{LevelTable, LockKey, LockLevel, MAX_LEVEL};
pub use path::{canonicalize, paths_equal, LocationPath, PathEquivalence, Segment, Syntactic};
