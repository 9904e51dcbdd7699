//! Two-phase driver.
//!
//! Phase 1 collects every guard, level, slot and routine signature into
//! read-only tables. Phase 2 walks each routine body, then the top-level
//! statements, each with a fresh [`ContextStack`].

use super::context::{ContextStack, Frame, HeldLock};
use super::diagnostic::{Diagnostic, LockError, Report, RoutineEffect, Scope};
use super::effects::{self, EffectInferer, RoutineType};
use super::guards::{GuardDescriptor, GuardRegistry, ProgramPoint};
use super::levels::{LevelTable, LockKey, LockLevel};
use super::ordering;
use super::path::{canonicalize, LocationPath, PathEquivalence, Syntactic};
use crate::ast::*;
use crate::config::Config;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Read-only declaration tables built by phase 1
#[derive(Debug)]
pub struct Declarations<'p> {
    pub guards: GuardRegistry,
    pub levels: LevelTable,
    pub slots: HashMap<String, LockLevel>,
    pub declared_effects: HashMap<String, LockLevel>,
    /// Unique routines in declaration order
    pub routines: Vec<&'p RoutineDecl>,
}

impl<'p> Declarations<'p> {
    pub fn collect(program: &'p Program, config: &Config, diagnostics: &mut Vec<Diagnostic>) -> Self {
        let mut decls = Declarations {
            guards: GuardRegistry::new(config.top_level_exemption),
            levels: LevelTable::new(),
            slots: HashMap::new(),
            declared_effects: HashMap::new(),
            routines: Vec::new(),
        };
        let mut report = |error: LockError, span: Span| {
            let diagnostic = Diagnostic::new(error, span, Scope::Declarations);
            log::debug!("{}", diagnostic);
            diagnostics.push(diagnostic);
        };

        for decl in program.lock_types() {
            if let Err(err) = decls.levels.declare_level(LockKey::Type(decl.name.clone()), decl.level) {
                report(err, decl.span);
            }
        }

        for decl in program.locks() {
            let path = canonicalize(&decl.target);
            if path.is_opaque() {
                report(LockError::OpaquePath { text: decl.target.to_string() }, decl.span);
                continue;
            }
            if let Some(level) = decl.level {
                if let Err(err) = decls.levels.declare_level(LockKey::Path(path.clone()), level) {
                    report(err, decl.span);
                }
            }
            if let Some(ty) = &decl.lock_type {
                if let Err(err) = decls.levels.declare_lock_type(path, ty.as_str()) {
                    report(err, decl.span);
                }
            }
        }

        // slots and routines share one namespace of callables
        let mut callables = HashSet::new();
        for decl in program.slots() {
            if !callables.insert(decl.name.as_str()) {
                report(LockError::DuplicateRoutine { name: decl.name.clone() }, decl.span);
                continue;
            }
            match LockLevel::new(decl.effect) {
                Some(effect) => {
                    decls.slots.insert(decl.name.clone(), effect);
                }
                None => report(
                    LockError::InvalidLevel { lock: format!("slot {}", decl.name), level: decl.effect },
                    decl.span,
                ),
            }
        }

        for routine in program.routines() {
            if !callables.insert(routine.name.as_str()) {
                report(LockError::DuplicateRoutine { name: routine.name.clone() }, routine.span);
                continue;
            }
            if let Some(raw) = routine.effect {
                match LockLevel::new(raw) {
                    Some(effect) => {
                        decls.declared_effects.insert(routine.name.clone(), effect);
                    }
                    None => report(
                        LockError::InvalidLevel { lock: format!("proc {}", routine.name), level: raw },
                        routine.span,
                    ),
                }
            }
            decls.routines.push(routine);
        }

        // guards last, so every lock level is known
        for decl in program.vars() {
            let Some(spec) = &decl.guard else { continue };
            let guard = match spec {
                GuardSpec::Barrier => GuardDescriptor::Barrier,
                GuardSpec::Lock(lock) => {
                    let path = canonicalize(lock);
                    if path.is_opaque() {
                        report(LockError::OpaquePath { text: lock.to_string() }, decl.span);
                    } else if let Err(err) = decls.levels.level_of(&path) {
                        report(err, decl.span);
                    }
                    GuardDescriptor::Lock(path)
                }
            };
            let location = canonicalize(&decl.target);
            if location.is_opaque() {
                report(LockError::OpaquePath { text: decl.target.to_string() }, decl.span);
                continue;
            }
            if let Err(err) = decls.guards.declare_guard(location, guard, decl.span) {
                report(err, decl.span);
            }
        }

        log::debug!(
            "collected {} guard(s), {} leveled lock(s), {} slot(s), {} routine(s)",
            decls.guards.len(),
            decls.levels.len(),
            decls.slots.len(),
            decls.routines.len()
        );
        decls
    }
}

/// Phase-2 checker over the collected tables
pub struct Checker<'a> {
    decls: &'a Declarations<'a>,
    effects: &'a BTreeMap<String, RoutineEffect>,
    config: &'a Config,
    eq: &'a dyn PathEquivalence,
}

impl<'a> Checker<'a> {
    pub fn new(
        decls: &'a Declarations<'a>,
        effects: &'a BTreeMap<String, RoutineEffect>,
        config: &'a Config,
        eq: &'a dyn PathEquivalence,
    ) -> Self {
        Self { decls, effects, config, eq }
    }

    pub fn check_routine(&self, routine: &RoutineDecl) -> Vec<Diagnostic> {
        log::debug!("checking proc {}", routine.name);
        let scope = Scope::Routine(routine.name.clone());
        let mut walker = BodyWalker::new(self, ProgramPoint::Routine(&routine.name), scope);

        if let Some(effect) = self.effects.get(&routine.name) {
            if let Err(err) = effects::check_declared(&routine.name, effect) {
                walker.report(err, routine.span);
            }
        }
        walker.walk_body(&routine.body, routine.span);
        walker.diagnostics
    }

    /// Top-level statements run as one initialization body.
    pub fn check_top_level(&self, stmts: &[&Stmt], span: Span) -> Vec<Diagnostic> {
        if stmts.is_empty() {
            return Vec::new();
        }
        log::debug!("checking {} top-level statement(s)", stmts.len());
        let mut walker = BodyWalker::new(self, ProgramPoint::TopLevel, Scope::TopLevel);
        walker.walk_body(stmts.iter().copied(), span);
        walker.diagnostics
    }

    fn callee_effect(&self, name: &str) -> Option<LockLevel> {
        self.effects
            .get(name)
            .map(RoutineEffect::signature)
            .or_else(|| self.decls.slots.get(name).copied())
    }
}

enum Flow {
    Continue,
    /// A `return` was reached; the rest of the body is not traversed
    Return,
    /// The stack went out of balance; the body is abandoned
    Abort,
}

struct BodyWalker<'w> {
    checker: &'w Checker<'w>,
    point: ProgramPoint<'w>,
    scope: Scope,
    /// Structured `locks` sections currently open
    structured: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'w> BodyWalker<'w> {
    fn new(checker: &'w Checker<'w>, point: ProgramPoint<'w>, scope: Scope) -> Self {
        Self {
            checker,
            point,
            scope,
            structured: 0,
            diagnostics: Vec::new(),
        }
    }

    fn report(&mut self, error: LockError, span: Span) {
        let diagnostic = Diagnostic::new(error, span, self.scope.clone());
        log::debug!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn unbalanced(&mut self, reason: impl Into<String>, span: Span) -> Flow {
        self.report(LockError::UnbalancedSection { reason: reason.into() }, span);
        Flow::Abort
    }

    fn walk_body<'s>(&mut self, body: impl IntoIterator<Item = &'s Stmt>, span: Span) {
        let mut stack = ContextStack::new();
        if let Flow::Continue = self.walk_block(body, &mut stack, 0) {
            if stack.depth() > 0 {
                let reason = format!("body ends with {} critical section(s) still open", stack.depth());
                self.unbalanced(reason, span);
            }
        }
    }

    /// `floor` is the depth below which `exit` may not pop: the innermost
    /// structured section's own frame.
    fn walk_block<'s>(
        &mut self,
        stmts: impl IntoIterator<Item = &'s Stmt>,
        stack: &mut ContextStack,
        floor: usize,
    ) -> Flow {
        for stmt in stmts {
            match self.walk_stmt(stmt, stack, floor) {
                Flow::Continue => {}
                flow => return flow,
            }
        }
        Flow::Continue
    }

    fn walk_stmt(&mut self, stmt: &Stmt, stack: &mut ContextStack, floor: usize) -> Flow {
        match stmt {
            Stmt::Locks(s) => {
                let frame = self.build_frame(&s.locks, s.span, stack);
                let (mut scope, verdict) = stack.enter_scoped(frame);
                if let Err(err) = verdict {
                    self.report(err, s.span);
                }
                let inner_floor = scope.depth();
                self.structured += 1;
                let flow = self.walk_block(&s.body, &mut scope, inner_floor);
                self.structured -= 1;
                match flow {
                    Flow::Continue if scope.depth() != inner_floor => {
                        let open = scope.depth().saturating_sub(inner_floor);
                        self.unbalanced(format!("section ends with {} entered section(s) still open", open), s.span)
                    }
                    flow => flow,
                }
            }
            Stmt::Enter(s) => {
                let frame = self.build_frame(&s.locks, s.span, stack);
                if let Err(err) = stack.enter(frame) {
                    self.report(err, s.span);
                }
                Flow::Continue
            }
            Stmt::Exit(s) => {
                if stack.depth() <= floor {
                    return self.unbalanced("exit without a matching enter", s.span);
                }
                match stack.exit() {
                    Ok(frame) => {
                        log::trace!("exit [{}]", frame.describe());
                        Flow::Continue
                    }
                    Err(err) => {
                        self.report(err, s.span);
                        Flow::Abort
                    }
                }
            }
            Stmt::If(s) => {
                self.check_expr(&s.condition, stack);
                let saved = stack.clone();
                let then_flow = self.walk_branch(&s.then_branch, stack, floor, s.span);
                *stack = saved.clone();
                let else_flow = match &s.else_branch {
                    Some(branch) => {
                        let flow = self.walk_branch(branch, stack, floor, s.span);
                        *stack = saved;
                        flow
                    }
                    None => Flow::Continue,
                };
                match (then_flow, else_flow) {
                    (Flow::Abort, _) | (_, Flow::Abort) => Flow::Abort,
                    (Flow::Return, Flow::Return) => Flow::Return,
                    _ => Flow::Continue,
                }
            }
            Stmt::While(s) => {
                self.check_expr(&s.condition, stack);
                let saved = stack.clone();
                let flow = self.walk_branch(&s.body, stack, floor, s.span);
                *stack = saved;
                match flow {
                    Flow::Abort => Flow::Abort,
                    // the loop may run zero times
                    _ => Flow::Continue,
                }
            }
            Stmt::Return(s) => {
                if let Some(value) = &s.value {
                    self.check_expr(value, stack);
                }
                let open = stack.depth().saturating_sub(self.structured);
                if open > 0 {
                    return self.unbalanced(format!("return with {} entered section(s) still open", open), s.span);
                }
                Flow::Return
            }
            Stmt::Bind(s) => {
                self.check_bind(s);
                Flow::Continue
            }
            Stmt::Assign(s) => {
                self.check_expr(&s.target, stack);
                self.check_expr(&s.value, stack);
                Flow::Continue
            }
            Stmt::Expr(s) => {
                self.check_expr(&s.expr, stack);
                Flow::Continue
            }
        }
    }

    /// Walk a conditional body, which must leave the stack depth unchanged.
    fn walk_branch(&mut self, body: &[Stmt], stack: &mut ContextStack, floor: usize, span: Span) -> Flow {
        let depth = stack.depth();
        match self.walk_block(body, stack, floor) {
            Flow::Continue if stack.depth() != depth => self.unbalanced(
                format!("branch changes the number of held sections from {} to {}", depth, stack.depth()),
                span,
            ),
            flow => flow,
        }
    }

    fn build_frame(&mut self, locks: &[Expr], span: Span, stack: &ContextStack) -> Frame {
        let checker = self.checker;
        let levels = &checker.decls.levels;
        let mut resolved = Vec::with_capacity(locks.len());
        for lock in locks {
            self.check_operands(lock, stack);
            let path = canonicalize(lock);
            let level = if path.is_opaque() {
                self.report(LockError::OpaquePath { text: lock.to_string() }, span);
                None
            } else {
                match levels.level_of(&path) {
                    Ok(level) => Some(level),
                    Err(err) => {
                        self.report(err, span);
                        None
                    }
                }
            };
            resolved.push((path, level));
        }

        let fallback = resolved
            .iter()
            .find_map(|(_, level)| *level)
            .unwrap_or(LockLevel::BARRIER);
        let held: Vec<HeldLock> = resolved
            .into_iter()
            .map(|(path, level)| HeldLock::new(path, level.unwrap_or(fallback)))
            .collect();

        match Frame::new(held.clone(), span) {
            Ok(frame) => frame,
            Err(err) => {
                self.report(err, span);
                // nested frames order against the lowest non-barrier lock
                let lowest = held
                    .iter()
                    .map(|lock| lock.level)
                    .filter(|level| !level.is_barrier())
                    .min()
                    .unwrap_or(fallback);
                Frame::with_level(held, lowest, span)
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr, stack: &ContextStack) {
        match expr {
            Expr::Ident(_) | Expr::Field(_) | Expr::Index(_) | Expr::Deref(_) => self.check_access(expr, stack),
            Expr::Literal(_) => {}
            Expr::Call(call) => {
                self.check_call(call, stack);
                for arg in &call.args {
                    self.check_expr(arg, stack);
                }
            }
            Expr::Unary(e) => self.check_expr(&e.operand, stack),
            Expr::Binary(e) => {
                self.check_expr(&e.left, stack);
                self.check_expr(&e.right, stack);
            }
        }
    }

    /// An access reads every prefix of its path.
    fn check_access(&mut self, expr: &Expr, stack: &ContextStack) {
        let path = canonicalize(expr);
        for prefix in path.prefixes() {
            self.check_location(&prefix, expr.span(), stack);
        }
        self.check_operands(expr, stack);
    }

    fn check_location(&mut self, location: &LocationPath, span: Span, stack: &ContextStack) {
        let verdict = self
            .checker
            .decls
            .guards
            .check_access(location, self.point, stack.current(), self.checker.eq);
        if let Err(err) = verdict {
            self.report(err, span);
        }
    }

    /// Index expressions and non-path bases inside an access chain
    fn check_operands(&mut self, expr: &Expr, stack: &ContextStack) {
        match expr {
            Expr::Ident(_) => {}
            Expr::Field(e) => self.check_operands(&e.target, stack),
            Expr::Deref(e) => self.check_operands(&e.target, stack),
            Expr::Index(e) => {
                self.check_operands(&e.target, stack);
                self.check_expr(&e.index, stack);
            }
            other => self.check_expr(other, stack),
        }
    }

    fn check_call(&mut self, call: &CallExpr, stack: &ContextStack) {
        let Some(effect) = self.checker.callee_effect(&call.callee) else {
            self.report(LockError::UnknownRoutine { name: call.callee.clone() }, call.span);
            return;
        };
        if self.checker.config.call_site_ordering {
            if let Err(err) = ordering::check_call_order(stack.frames(), &call.callee, effect) {
                self.report(err, call.span);
            }
        }
    }

    fn check_bind(&mut self, bind: &BindStmt) {
        let Some(slot_effect) = self.checker.decls.slots.get(&bind.slot).copied() else {
            self.report(LockError::UnknownSlot { name: bind.slot.clone() }, bind.span);
            return;
        };
        let Some(routine_effect) = self.checker.effects.get(&bind.routine).map(RoutineEffect::signature) else {
            self.report(LockError::UnknownRoutine { name: bind.routine.clone() }, bind.span);
            return;
        };
        let verdict = effects::check_binding(
            &bind.slot,
            RoutineType::new(slot_effect),
            &bind.routine,
            RoutineType::new(routine_effect),
        );
        if let Err(err) = verdict {
            self.report(err, bind.span);
        }
    }
}

/// Run both phases over `program`.
pub fn check_program(program: &Program, config: &Config) -> Report {
    let mut diagnostics = Vec::new();

    log::debug!("phase 1: collecting declarations");
    let decls = Declarations::collect(program, config, &mut diagnostics);

    let effects = EffectInferer::new(&decls.levels, &decls.slots).infer_all(&decls.routines, &decls.declared_effects);

    log::debug!("phase 2: checking {} routine(s)", decls.routines.len());
    let checker = Checker::new(&decls, &effects, config, &Syntactic);
    for routine in &decls.routines {
        diagnostics.extend(checker.check_routine(routine));
    }
    diagnostics.extend(checker.check_top_level(&program.top_level(), program.span));

    if let Some(max) = config.max_diagnostics {
        if diagnostics.len() > max {
            log::warn!("truncating {} diagnostics to {}", diagnostics.len(), max);
            diagnostics.truncate(max);
        }
    }
    log::debug!("analysis finished with {} diagnostic(s)", diagnostics.len());

    Report { diagnostics, effects }
}
