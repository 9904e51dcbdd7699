// Common test utilities
#![allow(dead_code)]

use locklevel::{analyze_source, Config, ErrorKind, Report};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn report_with(src: &str, config: &Config) -> Report {
    init_logger();
    analyze_source(src, config).expect("source should parse")
}

pub fn report(src: &str) -> Report {
    report_with(src, &Config::default())
}

pub fn kinds(src: &str) -> Vec<ErrorKind> {
    report(src).kinds()
}

/// No diagnostics at all, warnings included
pub fn ok(src: &str) {
    let report = report(src);
    assert!(report.diagnostics.is_empty(), "unexpected diagnostics: {:#?}", report.diagnostics);
}

pub fn err_kind(src: &str, kind: ErrorKind) {
    let report = report(src);
    assert!(report.has(kind), "expected {} in {:?}", kind, report.kinds());
}
