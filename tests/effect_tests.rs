mod common;

use common::{err_kind, kinds, ok, report, report_with};
use locklevel::analysis::LockLevel;
use locklevel::{Config, ErrorKind};

fn level(raw: i64) -> Option<LockLevel> {
    LockLevel::new(raw)
}

#[test]
fn effect_is_highest_frame_level() {
    let report = report("lock a level 5; lock b level 3; proc f() { locks (a) { locks (b) { } } }");
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.effect_of("f"), level(5));
}

#[test]
fn routine_without_sections_has_effect_zero() {
    assert_eq!(report("proc f() { }").effect_of("f"), level(0));
}

#[test]
fn declared_effect_below_inferred_errors() {
    assert_eq!(
        kinds("lock a level 5; proc f() effect 3 { locks (a) { } }"),
        vec![ErrorKind::EffectMismatch]
    );
}

#[test]
fn declared_effect_above_inferred_ok() {
    let report = report("lock a level 5; proc f() effect 7 { locks (a) { } }");
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.effect_of("f"), level(7));
    assert_eq!(report.effects["f"].inferred, LockLevel::new(5).unwrap());
}

#[test]
fn callee_effect_propagates_to_caller() {
    let report = report("lock a level 5; proc f() { locks (a) { } } proc g() { f(); } proc h() { g(); }");
    assert_eq!(report.effect_of("g"), level(5));
    assert_eq!(report.effect_of("h"), level(5));
}

#[test]
fn callers_see_declared_effect() {
    let report = report("lock a level 5; proc f() effect 8 { locks (a) { } } proc g() { f(); }");
    assert_eq!(report.effect_of("g"), level(8));
}

#[test]
fn callee_effect_counts_against_declared_bound() {
    err_kind(
        "lock a level 5; proc g() { locks (a) { } } proc f() effect 3 { g(); }",
        ErrorKind::EffectMismatch,
    );
}

#[test]
fn recursion_converges() {
    let report = report(
        "lock a level 4; lock b level 6; \
         proc f() { g(); locks (a) { } } \
         proc g() { h(); } \
         proc h() { f(); if 1 { locks (b) { } } }",
    );
    for name in ["f", "g", "h"] {
        assert_eq!(report.effect_of(name), level(6), "{name}");
    }
}

#[test]
fn calls_in_conditions_and_lock_lists_count() {
    let report = report(
        "lock a level 5; lock t[i].l level 1; \
         proc high() { locks (a) { } } \
         proc f() { while high() { } } \
         proc g(t) { locks (t[high()].l) { } }",
    );
    assert_eq!(report.effect_of("f"), level(5));
    assert_eq!(report.effect_of("g"), level(5));
}

#[test]
fn unknown_routine_is_a_warning() {
    let report = report("proc f() { missing(); }");
    assert_eq!(report.kinds(), vec![ErrorKind::UnknownRoutine]);
    assert!(report.is_clean());
    assert_eq!(report.warnings().count(), 1);
    assert_eq!(report.effect_of("f"), level(0));
}

#[test]
fn invalid_declared_effect_errors() {
    err_kind("proc f() effect 2000 { }", ErrorKind::InvalidLevel);
    err_kind("slot s effect -3;", ErrorKind::InvalidLevel);
}

#[test]
fn call_under_held_frame_is_not_ordered_by_default() {
    // g acquires level 3 while f already holds level 2
    let src = "lock a level 2; lock b level 3; \
               proc g() { locks (b) { } } \
               proc f() { locks (a) { g(); } }";
    ok(src);

    let strict = Config::default().with_call_site_ordering(true);
    let report = report_with(src, &strict);
    assert_eq!(report.kinds(), vec![ErrorKind::LockOrderViolation]);
    assert!(report.diagnostics[0].to_string().contains("call to 'g'"));
}

#[test]
fn strict_call_rule_accepts_lower_callees() {
    let src = "lock a level 2; lock x level 1; lock bar level 0; \
               proc g() { locks (x) { } } \
               proc z() { locks (bar) { } } \
               proc f() { locks (a) { g(); z(); } }";
    let strict = Config::default().with_call_site_ordering(true);
    assert!(report_with(src, &strict).diagnostics.is_empty());
}

mod slots {
    use super::*;

    const DECLS: &str = "lock a level 5; slot handler effect 3; \
                         proc low() effect 2 { } \
                         proc high() effect 5 { locks (a) { } }";

    #[test]
    fn binding_follows_m_le_n() {
        // proc{effect N} <: proc{effect M} iff M <= N
        ok(&format!("{} proc wire() {{ bind handler = high; }}", DECLS));
        err_kind(
            &format!("{} proc wire() {{ bind handler = low; }}", DECLS),
            ErrorKind::EffectMismatch,
        );
    }

    #[test]
    fn equal_effects_bind() {
        ok("slot s effect 4; proc f() effect 4 { } proc wire() { bind s = f; }");
    }

    #[test]
    fn calling_a_slot_contributes_its_effect() {
        let report = report(&format!("{} proc call() {{ handler(); }}", DECLS));
        assert_eq!(report.effect_of("call"), level(3));
    }

    #[test]
    fn unknown_slot_and_routine() {
        assert_eq!(kinds("proc f() { bind nope = f; }"), vec![ErrorKind::UnknownSlot]);
        assert_eq!(
            kinds("slot s effect 1; proc f() { bind s = nope; }"),
            vec![ErrorKind::UnknownRoutine]
        );
    }

    #[test]
    fn slot_and_routine_names_collide() {
        err_kind("slot f effect 1; proc f() { }", ErrorKind::DuplicateRoutine);
    }
}
