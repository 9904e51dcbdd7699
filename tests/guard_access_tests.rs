mod common;

use common::{err_kind, kinds, ok, report_with};
use locklevel::{Config, ErrorKind};

const DECLS: &str = r#"
lock a level 2;
lock bar level 0;
var x guarded by a;
var flag guarded by barrier;
var y;
"#;

fn with_decls(body: &str) -> String {
    format!("{}\n{}", DECLS, body)
}

#[test]
fn unguarded_location_is_accessible_anywhere() {
    ok(&with_decls("proc f() { y = y + 1; } y = 0;"));
}

#[test]
fn guarded_access_outside_section_errors() {
    err_kind(&with_decls("proc f() { x = 1; }"), ErrorKind::UnguardedAccess);
}

#[test]
fn guarded_read_outside_section_errors() {
    err_kind(&with_decls("proc f() { y = x; }"), ErrorKind::UnguardedAccess);
}

#[test]
fn structured_section_authorizes_access() {
    ok(&with_decls("proc f() { locks (a) { x = x + 1; } }"));
}

#[test]
fn explicit_brackets_authorize_access() {
    ok(&with_decls("proc f() { enter a; x = 1; exit; }"));
}

#[test]
fn access_after_exit_errors() {
    assert_eq!(
        kinds(&with_decls("proc f() { enter a; exit; x = 1; }")),
        vec![ErrorKind::UnguardedAccess]
    );
}

#[test]
fn top_level_access_is_exempt() {
    ok(&with_decls("x = 0; flag = 1;"));
}

#[test]
fn top_level_exemption_can_be_disabled() {
    let config = Config::default().with_top_level_exemption(false);
    let report = report_with(&with_decls("x = 0;"), &config);
    assert_eq!(report.kinds(), vec![ErrorKind::UnguardedAccess]);
}

#[test]
fn top_level_sections_still_count_when_not_exempt() {
    let config = Config::default().with_top_level_exemption(false);
    let report = report_with(&with_decls("locks (a) { x = 0; }"), &config);
    assert!(report.diagnostics.is_empty(), "{:?}", report.kinds());
}

#[test]
fn reading_a_field_reads_its_guarded_base() {
    err_kind(
        "lock a level 2; var s guarded by a; proc f() { s.count = 1; }",
        ErrorKind::UnguardedAccess,
    );
}

#[test]
fn index_expressions_are_checked() {
    err_kind(
        "lock a level 2; var k guarded by a; var arr; proc f() { arr[k] = 1; }",
        ErrorKind::UnguardedAccess,
    );
    ok("lock a level 2; var k guarded by a; var arr; proc f() { locks (a) { arr[k] = 1; } }");
}

#[test]
fn call_arguments_are_checked() {
    err_kind(
        "lock a level 2; var x guarded by a; proc g(v) { } proc f() { g(x); }",
        ErrorKind::UnguardedAccess,
    );
}

#[test]
fn compound_guard_paths_match_by_tokens() {
    let decls = "lock t[i].l level 3; var t[i].v guarded by t[i].l;";
    ok(&format!("{} proc f(i) {{ locks (t[i].l) {{ t[i].v = 1; }} }}", decls));
    err_kind(
        &format!("{} proc f(i, j) {{ locks (t[j].l) {{ t[i].v = 1; }} }}", decls),
        ErrorKind::UnguardedAccess,
    );
}

#[test]
fn reassigned_index_is_not_caught() {
    // i changes between acquiring t[i].l and touching t[i].v
    ok("lock t[i].l level 3; var t[i].v guarded by t[i].l; \
        proc f(i, j) { locks (t[i].l) { i = j; t[i].v = 1; } }");
}

#[test]
fn runtime_equal_index_is_a_different_location() {
    // t[i + 0].v has no binding of its own
    ok("lock t[i].l level 3; var t[i].v guarded by t[i].l; \
        proc f(i) { t[i + 0].v = 1; }");
}

#[test]
fn barrier_guard_needs_a_level_zero_section() {
    err_kind(&with_decls("proc f() { flag = 1; }"), ErrorKind::UnguardedAccess);
    err_kind(&with_decls("proc f() { locks (a) { flag = 1; } }"), ErrorKind::UnguardedAccess);
    ok(&with_decls("proc f() { locks (bar) { flag = 1; } }"));
}

#[test]
fn typed_lock_guards_access() {
    ok("locktype Mutex level 5; lock m : Mutex; var x guarded by m; \
        proc f() { locks (m) { x = 1; } }");
}

#[test]
fn duplicate_guard_errors() {
    assert_eq!(
        kinds("lock a level 1; lock b level 1; var x guarded by a; var x guarded by b;"),
        vec![ErrorKind::DuplicateGuard]
    );
}

#[test]
fn opaque_lock_expression_never_authorizes() {
    let src = "lock a level 2; var x guarded by a; proc g() { } proc f() { locks (g()) { x = 1; } }";
    let found = kinds(src);
    assert!(found.contains(&ErrorKind::OpaquePath), "{:?}", found);
    assert!(found.contains(&ErrorKind::UnguardedAccess), "{:?}", found);
}

#[test]
fn opaque_guard_is_not_satisfied_by_the_same_opaque_lock() {
    let src = "proc g() { } var x guarded by g(); proc f() { locks (g()) { x = 1; } }";
    let found = kinds(src);
    assert!(found.contains(&ErrorKind::UnguardedAccess), "{:?}", found);
}

#[test]
fn diagnostic_names_location_and_guard() {
    let report = common::report(&with_decls("proc work() { x = 1; }"));
    let message = report.diagnostics[0].to_string();
    assert!(message.contains("UnguardedAccessError"), "{message}");
    assert!(message.contains("'x'"), "{message}");
    assert!(message.contains("'a'"), "{message}");
    assert!(message.contains("proc work"), "{message}");
}
