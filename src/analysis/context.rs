//! Active-context stack: the critical-section frames statically held at a
//! program point.

use super::diagnostic::LockError;
use super::levels::LockLevel;
use super::ordering;
use super::path::{LocationPath, PathEquivalence};
use crate::ast::Span;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldLock {
    pub path: LocationPath,
    pub level: LockLevel,
}

impl HeldLock {
    pub fn new(path: LocationPath, level: LockLevel) -> Self {
        Self { path, level }
    }
}

/// One critical-section annotation: locks acquired together at one level.
#[derive(Debug, Clone)]
pub struct Frame {
    locks: Vec<HeldLock>,
    level: LockLevel,
    span: Span,
}

impl Frame {
    /// Build a frame, rejecting locks of differing levels.
    pub fn new(locks: Vec<HeldLock>, span: Span) -> Result<Self, LockError> {
        let level = ordering::common_level(&locks)?;
        Ok(Self { locks, level, span })
    }

    /// Build a frame with a level chosen by the caller, skipping the
    /// uniformity check. Used to keep bookkeeping going after a reported
    /// mixed-level frame.
    pub fn with_level(locks: Vec<HeldLock>, level: LockLevel, span: Span) -> Self {
        Self { locks, level, span }
    }

    pub fn level(&self) -> LockLevel {
        self.level
    }

    pub fn locks(&self) -> &[HeldLock] {
        &self.locks
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Lock paths of the frame, comma separated
    pub fn describe(&self) -> String {
        self.locks
            .iter()
            .map(|lock| lock.path.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Read-only view of every live frame
#[derive(Debug, Clone, Copy)]
pub struct ActiveLockSet<'a> {
    frames: &'a [Frame],
}

impl<'a> ActiveLockSet<'a> {
    pub fn new(frames: &'a [Frame]) -> Self {
        Self { frames }
    }

    pub fn empty() -> Self {
        Self { frames: &[] }
    }

    pub fn locks(&self) -> impl Iterator<Item = &'a HeldLock> {
        self.frames.iter().flat_map(|frame| frame.locks.iter())
    }

    pub fn frames(&self) -> &'a [Frame] {
        self.frames
    }

    pub fn holds(&self, path: &LocationPath, eq: &dyn PathEquivalence) -> bool {
        self.locks().any(|lock| eq.equivalent(&lock.path, path))
    }

    pub fn has_barrier_frame(&self) -> bool {
        self.frames.iter().any(|frame| frame.level.is_barrier())
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// LIFO stack of frames, scoped to one routine-body traversal
#[derive(Debug, Clone, Default)]
pub struct ContextStack {
    frames: Vec<Frame>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `frame` after checking it against the held frames.
    ///
    /// The frame is pushed even when the ordering check fails, so that the
    /// matching `exit` still pairs up.
    pub fn enter(&mut self, frame: Frame) -> Result<(), LockError> {
        let verdict = ordering::check_order(&self.frames, &frame);
        log::trace!(
            "enter [{}] at level {} (depth {})",
            frame.describe(),
            frame.level,
            self.frames.len()
        );
        self.frames.push(frame);
        verdict
    }

    pub fn exit(&mut self) -> Result<Frame, LockError> {
        self.frames.pop().ok_or_else(|| LockError::UnbalancedSection {
            reason: "exit without a matching enter".to_string(),
        })
    }

    /// Push `frame` for the lifetime of the returned scope. Dropping the
    /// scope pops it, along with anything left above it.
    pub fn enter_scoped(&mut self, frame: Frame) -> (FrameScope<'_>, Result<(), LockError>) {
        let base = self.frames.len();
        let verdict = self.enter(frame);
        (FrameScope { stack: self, base }, verdict)
    }

    pub fn current(&self) -> ActiveLockSet<'_> {
        ActiveLockSet::new(&self.frames)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn truncate(&mut self, depth: usize) {
        self.frames.truncate(depth);
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

/// Guard returned by [`ContextStack::enter_scoped`]
pub struct FrameScope<'s> {
    stack: &'s mut ContextStack,
    base: usize,
}

impl Deref for FrameScope<'_> {
    type Target = ContextStack;

    fn deref(&self) -> &ContextStack {
        self.stack
    }
}

impl DerefMut for FrameScope<'_> {
    fn deref_mut(&mut self) -> &mut ContextStack {
        self.stack
    }
}

impl Drop for FrameScope<'_> {
    fn drop(&mut self) {
        self.stack.truncate(self.base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::diagnostic::ErrorKind;
    use crate::analysis::path::Syntactic;

    fn lock(name: &str, level: u16) -> HeldLock {
        HeldLock::new(LocationPath::symbol(name), LockLevel::new(i64::from(level)).unwrap())
    }

    fn frame(locks: Vec<HeldLock>) -> Frame {
        Frame::new(locks, Span::default()).expect("frame")
    }

    #[test]
    fn scenario_from_level_table() {
        // a and b at level 2, x at level 1
        let mut stack = ContextStack::new();
        stack.enter(frame(vec![lock("x", 1)])).expect("x");
        let err = stack.enter(frame(vec![lock("a", 2)])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockOrderViolation);

        let mut stack = ContextStack::new();
        stack.enter(frame(vec![lock("a", 2)])).expect("a");
        assert!(stack.enter(frame(vec![lock("x", 1)])).is_ok());

        let mut stack = ContextStack::new();
        stack.enter(frame(vec![lock("a", 2)])).expect("a");
        let err = stack.enter(frame(vec![lock("b", 2)])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockOrderViolation);

        let mut stack = ContextStack::new();
        assert!(stack.enter(frame(vec![lock("a", 2), lock("b", 2)])).is_ok());
    }

    #[test]
    fn failed_enter_still_pushes() {
        let mut stack = ContextStack::new();
        stack.enter(frame(vec![lock("a", 2)])).expect("a");
        assert!(stack.enter(frame(vec![lock("b", 5)])).is_err());
        assert_eq!(stack.depth(), 2);
        stack.exit().expect("pop b");
        stack.exit().expect("pop a");
        assert_eq!(stack.exit().unwrap_err().kind(), ErrorKind::UnbalancedSection);
    }

    #[test]
    fn current_is_union_of_frames() {
        let mut stack = ContextStack::new();
        stack.enter(frame(vec![lock("a", 3), lock("b", 3)])).expect("ab");
        stack.enter(frame(vec![lock("c", 1)])).expect("c");
        let active = stack.current();
        for name in ["a", "b", "c"] {
            assert!(active.holds(&LocationPath::symbol(name), &Syntactic));
        }
        assert!(!active.holds(&LocationPath::symbol("d"), &Syntactic));
    }

    #[test]
    fn scope_pops_on_drop() {
        let mut stack = ContextStack::new();
        stack.enter(frame(vec![lock("a", 3)])).expect("a");
        {
            let (mut scope, verdict) = stack.enter_scoped(frame(vec![lock("b", 2)]));
            assert!(verdict.is_ok());
            scope.enter(frame(vec![lock("c", 1)])).expect("c");
            assert_eq!(scope.depth(), 3);
        }
        assert_eq!(stack.depth(), 1);
        assert!(stack.current().holds(&LocationPath::symbol("a"), &Syntactic));
    }
}
