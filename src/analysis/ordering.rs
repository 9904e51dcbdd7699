//! Level ordering rules for nested critical sections.
//!
//! A frame's locks must share one level. A new frame must sit strictly
//! below every held frame. Level 0 never participates in ordering.
//!
//! A mixed-level frame is still checked lock by lock, so its highest lock
//! orders against what is held while its lowest one bounds what nests inside.

use super::context::{Frame, HeldLock};
use super::diagnostic::LockError;
use super::levels::LockLevel;

/// The common level of locks acquired together.
pub fn common_level(locks: &[HeldLock]) -> Result<LockLevel, LockError> {
    let Some(first) = locks.first() else {
        return Ok(LockLevel::BARRIER);
    };
    match locks.iter().find(|lock| lock.level != first.level) {
        Some(other) => Err(LockError::MixedLevelFrame {
            first: first.path.to_string(),
            first_level: first.level,
            other: other.path.to_string(),
            other_level: other.level,
        }),
        None => Ok(first.level),
    }
}

/// The held frame that bounds new acquisitions: the lowest non-barrier one.
pub fn binding_frame(held: &[Frame]) -> Option<&Frame> {
    held.iter()
        .filter(|frame| !frame.level().is_barrier())
        .min_by_key(|frame| frame.level())
}

/// Highest non-barrier level among the locks of `frame`.
fn highest_level(frame: &Frame) -> Option<LockLevel> {
    frame.locks()
        .iter()
        .map(|lock| lock.level)
        .filter(|level| !level.is_barrier())
        .max()
}

/// Check that `frame` may be pushed on top of `held`.
pub fn check_order(held: &[Frame], frame: &Frame) -> Result<(), LockError> {
    let Some(level) = highest_level(frame) else {
        return Ok(());
    };
    match binding_frame(held) {
        Some(bound) if level >= bound.level() => Err(LockError::LockOrderViolation {
            lock: frame.describe(),
            level,
            held: bound.describe(),
            held_level: bound.level(),
        }),
        _ => Ok(()),
    }
}

/// Call-site rule: the callee's effect treated as an implicit frame.
pub fn check_call_order(held: &[Frame], callee: &str, effect: LockLevel) -> Result<(), LockError> {
    if effect.is_barrier() {
        return Ok(());
    }
    match binding_frame(held) {
        Some(bound) if effect >= bound.level() => Err(LockError::CallOrderViolation {
            callee: callee.to_string(),
            effect,
            held: bound.describe(),
            held_level: bound.level(),
        }),
        _ => Ok(()),
    }
}
