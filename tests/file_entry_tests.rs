mod common;

use locklevel::{analyze_file, Config, Error, ErrorKind};
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const GOOD: &str = r#"
lock a level 2;
var counter guarded by a;

proc bump() {
    locks (a) {
        counter = counter + 1;
    }
}

counter = 0;
"#;

const BAD: &str = r#"
lock a level 2;
var counter guarded by a;

proc bump() {
    counter = counter + 1;
}
"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dirs");
    }
    fs::write(&path, contents).expect("write source");
    path
}

#[test]
fn analyze_file_reads_and_checks() {
    common::init_logger();
    let dir = TempDir::new().expect("temp dir");
    let good = write(&dir, "good.lkl", GOOD);
    let bad = write(&dir, "bad.lkl", BAD);

    assert!(analyze_file(&good, &Config::default()).expect("good").diagnostics.is_empty());
    let report = analyze_file(&bad, &Config::default()).expect("bad");
    assert!(report.has(ErrorKind::UnguardedAccess));
    assert!(!report.is_clean());
}

#[test]
fn file_errors_name_the_file() {
    let dir = TempDir::new().expect("temp dir");
    let missing = dir.path().join("missing.lkl");
    let err = analyze_file(&missing, &Config::default()).unwrap_err();
    assert!(matches!(err, Error::InFile { .. }));
    assert!(err.to_string().contains("missing.lkl"), "{err}");

    let broken = write(&dir, "broken.lkl", "proc {");
    let err = analyze_file(&broken, &Config::default()).unwrap_err();
    assert!(err.to_string().contains("broken.lkl"), "{err}");
}

fn locklevel() -> Command {
    Command::new(env!("CARGO_BIN_EXE_locklevel"))
}

#[test]
fn check_walks_directories_and_fails_on_errors() {
    let dir = TempDir::new().expect("temp dir");
    write(&dir, "good.lkl", GOOD);
    write(&dir, "nested/bad.lkl", BAD);
    write(&dir, "nested/notes.txt", "proc {");

    let output = locklevel().arg("check").arg(dir.path()).output().expect("run check");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!output.status.success(), "{stdout}");
    assert!(stdout.contains("bad.lkl"), "{stdout}");
    assert!(stdout.contains("UnguardedAccessError"), "{stdout}");
    assert!(stdout.contains("2 file(s) checked"), "{stdout}");
}

#[test]
fn check_succeeds_on_clean_files() {
    let dir = TempDir::new().expect("temp dir");
    let good = write(&dir, "good.lkl", GOOD);

    let output = locklevel().arg("check").arg(&good).output().expect("run check");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));
}

#[test]
fn check_flags_reach_the_analyzer() {
    let dir = TempDir::new().expect("temp dir");
    let good = write(&dir, "good.lkl", GOOD);

    let output = locklevel()
        .args(["check", "--no-toplevel-exemption"])
        .arg(&good)
        .output()
        .expect("run check");
    assert!(!output.status.success());
}

#[test]
fn effects_lists_every_routine() {
    let dir = TempDir::new().expect("temp dir");
    let file = write(
        &dir,
        "effects.lkl",
        "lock a level 5; proc f() { locks (a) { } } proc g() effect 9 { f(); }",
    );

    let output = locklevel().arg("effects").arg(&file).output().expect("run effects");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{stdout}");
    assert!(stdout.contains("f: effect 5 (inferred)"), "{stdout}");
    assert!(stdout.contains("g: effect 9 (inferred 5, declared 9)"), "{stdout}");
}
