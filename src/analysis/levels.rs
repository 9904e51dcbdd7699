//! Lock level table: which level each lock object or lock type carries.

use super::diagnostic::LockError;
use super::path::LocationPath;
use std::collections::HashMap;
use std::fmt;

pub const MAX_LEVEL: u16 = 1000;

/// Integer lock priority in `[0, 1000]`. Level 0 means barrier-only: no
/// blocking lock is acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LockLevel(u16);

impl LockLevel {
    pub const BARRIER: LockLevel = LockLevel(0);
    pub const MAX: LockLevel = LockLevel(MAX_LEVEL);

    pub fn new(raw: i64) -> Option<Self> {
        if (0..=i64::from(MAX_LEVEL)).contains(&raw) {
            Some(LockLevel(raw as u16))
        } else {
            None
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn is_barrier(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for LockLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a level is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    Path(LocationPath),
    Type(String),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Path(path) => write!(f, "{}", path),
            LockKey::Type(name) => write!(f, "type {}", name),
        }
    }
}

#[derive(Debug, Default)]
pub struct LevelTable {
    locks: HashMap<LocationPath, LockLevel>,
    types: HashMap<String, LockLevel>,
    lock_types: HashMap<LocationPath, String>,
}

impl LevelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_level(&mut self, key: LockKey, raw: i64) -> Result<LockLevel, LockError> {
        let level = LockLevel::new(raw).ok_or_else(|| LockError::InvalidLevel {
            lock: key.to_string(),
            level: raw,
        })?;
        let duplicate = match &key {
            LockKey::Path(path) => self.locks.contains_key(path) || self.lock_types.contains_key(path),
            LockKey::Type(name) => self.types.contains_key(name),
        };
        if duplicate {
            return Err(LockError::DuplicateLevel { lock: key.to_string() });
        }
        match key {
            LockKey::Path(path) => {
                self.locks.insert(path, level);
            }
            LockKey::Type(name) => {
                self.types.insert(name, level);
            }
        }
        Ok(level)
    }

    /// Attach a lock type to a lock object; the object inherits the type's level.
    pub fn declare_lock_type(&mut self, lock: LocationPath, type_name: impl Into<String>) -> Result<(), LockError> {
        if self.locks.contains_key(&lock) || self.lock_types.contains_key(&lock) {
            return Err(LockError::DuplicateLevel { lock: lock.to_string() });
        }
        self.lock_types.insert(lock, type_name.into());
        Ok(())
    }

    pub fn level_of(&self, lock: &LocationPath) -> Result<LockLevel, LockError> {
        if let Some(level) = self.locks.get(lock) {
            return Ok(*level);
        }
        self.lock_types
            .get(lock)
            .and_then(|ty| self.types.get(ty))
            .copied()
            .ok_or_else(|| LockError::UndeclaredLevel { lock: lock.to_string() })
    }

    pub fn len(&self) -> usize {
        self.locks.len() + self.lock_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::diagnostic::ErrorKind;

    #[test]
    fn levels_outside_range_are_rejected() {
        let mut table = LevelTable::new();
        for raw in [-1, 1001, i64::MAX] {
            let err = table.declare_level(LockKey::Path(LocationPath::symbol("a")), raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidLevel);
        }
        assert!(table.declare_level(LockKey::Path(LocationPath::symbol("a")), 1000).is_ok());
        assert!(table.declare_level(LockKey::Path(LocationPath::symbol("b")), 0).is_ok());
    }

    #[test]
    fn duplicate_levels_are_rejected() {
        let mut table = LevelTable::new();
        let a = LocationPath::symbol("a");
        table.declare_level(LockKey::Path(a.clone()), 2).expect("first");
        let err = table.declare_level(LockKey::Path(a.clone()), 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateLevel);
        let err = table.declare_lock_type(a.clone(), "Mutex").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateLevel);
        assert_eq!(table.level_of(&a), Ok(LockLevel::new(2).unwrap()));
    }

    #[test]
    fn typed_locks_inherit_type_level() {
        let mut table = LevelTable::new();
        table.declare_level(LockKey::Type("Mutex".into()), 5).expect("type");
        let m = LocationPath::symbol("m");
        table.declare_lock_type(m.clone(), "Mutex").expect("typed lock");
        assert_eq!(table.level_of(&m).map(LockLevel::get), Ok(5));
    }

    #[test]
    fn undeclared_levels_are_reported() {
        let mut table = LevelTable::new();
        let n = LocationPath::symbol("n");
        table.declare_lock_type(n.clone(), "Missing").expect("typed lock");
        assert_eq!(table.level_of(&n).unwrap_err().kind(), ErrorKind::UndeclaredLevel);
        assert_eq!(
            table.level_of(&LocationPath::symbol("zz")).unwrap_err().kind(),
            ErrorKind::UndeclaredLevel
        );
    }
}
