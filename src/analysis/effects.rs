//! Routine lock-level effects: inference, declared-bound checks and
//! subtyping between routine types.

use super::diagnostic::{LockError, RoutineEffect};
use super::levels::{LevelTable, LockLevel};
use super::path::canonicalize;
use crate::ast::{Expr, RoutineDecl, Stmt};
use std::collections::{BTreeMap, HashMap};

/// The effect-relevant part of a routine type: `proc() {effect: N}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutineType {
    pub effect: LockLevel,
}

impl RoutineType {
    pub fn new(effect: LockLevel) -> Self {
        Self { effect }
    }

    /// `proc() {effect: N}` is a subtype of `proc() {effect: M}` iff `M <= N`.
    pub fn is_subtype_of(&self, other: &RoutineType) -> bool {
        other.effect <= self.effect
    }
}

/// Check that `routine` may be stored in `slot`.
pub fn check_binding(
    slot: &str,
    slot_type: RoutineType,
    routine: &str,
    routine_type: RoutineType,
) -> Result<(), LockError> {
    if routine_type.is_subtype_of(&slot_type) {
        Ok(())
    } else {
        Err(LockError::SlotMismatch {
            slot: slot.to_string(),
            slot_effect: slot_type.effect,
            routine: routine.to_string(),
            routine_effect: routine_type.effect,
        })
    }
}

/// The inferred effect must stay within the declared one.
pub fn check_declared(routine: &str, effect: &RoutineEffect) -> Result<(), LockError> {
    match effect.declared {
        Some(declared) if effect.inferred > declared => Err(LockError::EffectMismatch {
            routine: routine.to_string(),
            inferred: effect.inferred,
            declared,
        }),
        _ => Ok(()),
    }
}

pub struct EffectInferer<'a> {
    levels: &'a LevelTable,
    slots: &'a HashMap<String, LockLevel>,
}

impl<'a> EffectInferer<'a> {
    pub fn new(levels: &'a LevelTable, slots: &'a HashMap<String, LockLevel>) -> Self {
        Self { levels, slots }
    }

    /// Maximum level over every frame the body opens and every callee
    /// signature it calls. `signatures` holds the callee effects to use;
    /// slots contribute their declared effect, unknown callees nothing.
    pub fn infer_effect(&self, body: &[Stmt], signatures: &HashMap<String, LockLevel>) -> LockLevel {
        let mut max = LockLevel::BARRIER;
        for stmt in body {
            max = max.max(self.stmt_effect(stmt, signatures));
        }
        max
    }

    fn stmt_effect(&self, stmt: &Stmt, signatures: &HashMap<String, LockLevel>) -> LockLevel {
        match stmt {
            Stmt::Locks(s) => self
                .frame_effect(&s.locks, signatures)
                .max(self.infer_effect(&s.body, signatures)),
            Stmt::Enter(s) => self.frame_effect(&s.locks, signatures),
            Stmt::Exit(_) | Stmt::Bind(_) => LockLevel::BARRIER,
            Stmt::If(s) => {
                let mut max = self.expr_effect(&s.condition, signatures);
                max = max.max(self.infer_effect(&s.then_branch, signatures));
                if let Some(else_branch) = &s.else_branch {
                    max = max.max(self.infer_effect(else_branch, signatures));
                }
                max
            }
            Stmt::While(s) => self
                .expr_effect(&s.condition, signatures)
                .max(self.infer_effect(&s.body, signatures)),
            Stmt::Return(s) => s
                .value
                .as_ref()
                .map_or(LockLevel::BARRIER, |value| self.expr_effect(value, signatures)),
            Stmt::Assign(s) => self
                .expr_effect(&s.target, signatures)
                .max(self.expr_effect(&s.value, signatures)),
            Stmt::Expr(s) => self.expr_effect(&s.expr, signatures),
        }
    }

    fn frame_effect(&self, locks: &[Expr], signatures: &HashMap<String, LockLevel>) -> LockLevel {
        locks
            .iter()
            .map(|lock| {
                // undeclared levels are reported by the checker, not here
                let own = self.levels.level_of(&canonicalize(lock)).unwrap_or(LockLevel::BARRIER);
                own.max(self.expr_effect(lock, signatures))
            })
            .max()
            .unwrap_or(LockLevel::BARRIER)
    }

    fn expr_effect(&self, expr: &Expr, signatures: &HashMap<String, LockLevel>) -> LockLevel {
        let mut max = LockLevel::BARRIER;
        expr.for_each_call(&mut |call| {
            if let Some(effect) = self.callee_effect(&call.callee, signatures) {
                max = max.max(effect);
            }
        });
        max
    }

    pub fn callee_effect(&self, callee: &str, signatures: &HashMap<String, LockLevel>) -> Option<LockLevel> {
        signatures
            .get(callee)
            .or_else(|| self.slots.get(callee))
            .copied()
    }

    /// Infer every routine's effect as a least fixpoint over the call graph.
    ///
    /// Callers see a routine's declared effect when it has one, its inferred
    /// effect otherwise. Recursion converges because effects only grow and
    /// are bounded by [`LockLevel::MAX`].
    pub fn infer_all(
        &self,
        routines: &[&RoutineDecl],
        declared: &HashMap<String, LockLevel>,
    ) -> BTreeMap<String, RoutineEffect> {
        let mut inferred: HashMap<String, LockLevel> = routines
            .iter()
            .map(|routine| (routine.name.clone(), LockLevel::BARRIER))
            .collect();

        let mut rounds = 0usize;
        loop {
            rounds += 1;
            let signatures: HashMap<String, LockLevel> = inferred
                .iter()
                .map(|(name, level)| (name.clone(), declared.get(name).copied().unwrap_or(*level)))
                .collect();
            let mut changed = false;
            for routine in routines {
                let effect = self.infer_effect(&routine.body, &signatures);
                let entry = inferred.entry(routine.name.clone()).or_default();
                if effect > *entry {
                    *entry = effect;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        log::debug!("effect inference converged after {} round(s)", rounds);

        inferred
            .into_iter()
            .map(|(name, inferred)| {
                let effect = RoutineEffect {
                    inferred,
                    declared: declared.get(&name).copied(),
                };
                (name, effect)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::diagnostic::ErrorKind;
    use crate::analysis::levels::LockKey;
    use crate::analysis::path::LocationPath;
    use crate::parser::parse_program;

    fn level(raw: i64) -> LockLevel {
        LockLevel::new(raw).unwrap()
    }

    #[test]
    fn subtyping_follows_m_le_n() {
        let n5 = RoutineType::new(level(5));
        let m3 = RoutineType::new(level(3));
        assert!(n5.is_subtype_of(&m3));
        assert!(!m3.is_subtype_of(&n5));
        assert!(m3.is_subtype_of(&m3));
    }

    #[test]
    fn declared_effect_bounds_inferred() {
        let inferred5 = |declared| RoutineEffect { inferred: level(5), declared: Some(level(declared)) };
        assert_eq!(
            check_declared("f", &inferred5(3)).unwrap_err().kind(),
            ErrorKind::EffectMismatch
        );
        assert!(check_declared("f", &inferred5(7)).is_ok());
        assert!(check_declared("f", &inferred5(5)).is_ok());
    }

    #[test]
    fn effects_propagate_through_calls_and_recursion() {
        let program = parse_program(
            r#"
            proc leaf() { locks (a) { } }
            proc mid() { leaf(); }
            proc top() effect 9 { mid(); }
            proc caller() { top(); }
            proc ping() { pong(); locks (x) { } }
            proc pong() { ping(); }
            "#,
        )
        .expect("parse");
        let mut levels = LevelTable::new();
        levels.declare_level(LockKey::Path(LocationPath::symbol("a")), 4).unwrap();
        levels.declare_level(LockKey::Path(LocationPath::symbol("x")), 2).unwrap();
        let slots = HashMap::new();
        let routines: Vec<&RoutineDecl> = program.routines().collect();
        let declared = HashMap::from([("top".to_string(), level(9))]);

        let effects = EffectInferer::new(&levels, &slots).infer_all(&routines, &declared);
        assert_eq!(effects["leaf"].inferred, level(4));
        assert_eq!(effects["mid"].inferred, level(4));
        assert_eq!(effects["top"].inferred, level(4));
        assert_eq!(effects["top"].signature(), level(9));
        // callers see the declared bound, not the body
        assert_eq!(effects["caller"].inferred, level(9));
        assert_eq!(effects["ping"].inferred, level(2));
        assert_eq!(effects["pong"].inferred, level(2));
    }

    #[test]
    fn slot_calls_contribute_slot_effect() {
        let program = parse_program("proc f() { handler(); missing(); }").expect("parse");
        let levels = LevelTable::new();
        let slots = HashMap::from([("handler".to_string(), level(6))]);
        let routines: Vec<&RoutineDecl> = program.routines().collect();
        let effects = EffectInferer::new(&levels, &slots).infer_all(&routines, &HashMap::new());
        assert_eq!(effects["f"].inferred, level(6));
    }
}
