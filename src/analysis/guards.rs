//! Guard registry: which locations are guarded, and by what.

use super::context::ActiveLockSet;
use super::diagnostic::LockError;
use super::path::{LocationPath, PathEquivalence};
use crate::ast::Span;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDescriptor {
    Lock(LocationPath),
    /// Level-0 placeholder: satisfied by any live barrier frame
    Barrier,
}

impl fmt::Display for GuardDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardDescriptor::Lock(path) => write!(f, "{}", path),
            GuardDescriptor::Barrier => f.write_str("a barrier section"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GuardBinding {
    pub location: LocationPath,
    pub guard: GuardDescriptor,
    pub span: Span,
}

/// Where an access happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramPoint<'a> {
    /// Module-initialization code
    TopLevel,
    Routine(&'a str),
}

#[derive(Debug)]
pub struct GuardRegistry {
    bindings: HashMap<LocationPath, GuardBinding>,
    top_level_exemption: bool,
}

impl Default for GuardRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}

impl GuardRegistry {
    pub fn new(top_level_exemption: bool) -> Self {
        Self {
            bindings: HashMap::new(),
            top_level_exemption,
        }
    }

    pub fn declare_guard(&mut self, location: LocationPath, guard: GuardDescriptor, span: Span) -> Result<(), LockError> {
        if location.is_opaque() {
            return Err(LockError::OpaquePath { text: location.to_string() });
        }
        if self.bindings.contains_key(&location) {
            return Err(LockError::DuplicateGuard { location: location.to_string() });
        }
        self.bindings.insert(location.clone(), GuardBinding { location, guard, span });
        Ok(())
    }

    pub fn lookup_guard(&self, location: &LocationPath) -> Option<&GuardDescriptor> {
        if location.is_opaque() {
            return None;
        }
        self.bindings.get(location).map(|binding| &binding.guard)
    }

    /// Initialization-time code is exempt, on the caller's word that nothing
    /// runs concurrently yet.
    pub fn is_top_level_context(&self, point: ProgramPoint<'_>) -> bool {
        self.top_level_exemption && point == ProgramPoint::TopLevel
    }

    pub fn check_access(
        &self,
        location: &LocationPath,
        point: ProgramPoint<'_>,
        active: ActiveLockSet<'_>,
        eq: &dyn PathEquivalence,
    ) -> Result<(), LockError> {
        let Some(guard) = self.lookup_guard(location) else {
            return Ok(());
        };
        if self.is_top_level_context(point) {
            return Ok(());
        }
        let held = match guard {
            GuardDescriptor::Lock(lock) => active.holds(lock, eq),
            GuardDescriptor::Barrier => active.has_barrier_frame(),
        };
        if held {
            Ok(())
        } else {
            Err(LockError::UnguardedAccess {
                location: location.to_string(),
                guard: guard.to_string(),
            })
        }
    }

    pub fn bindings(&self) -> impl Iterator<Item = &GuardBinding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
