//! Request tracking: start, end, metadata, and the report scenario.

use std::time::Duration;

use lookout_debug::{Debugger, DebuggerConfig};
use lookout_foundation::{Category, ErrorKind, Severity};
use serde_json::json;

use crate::verbose_recorder;

#[test]
fn duplicate_start_is_an_error_and_keeps_the_original() {
    let recorder = verbose_recorder();
    recorder.start_request("r1", "GET", "/first").unwrap();
    let err = recorder.start_request("r1", "POST", "/second").unwrap_err();

    assert!(matches!(err.kind, ErrorKind::DuplicateRequest(_)));
    assert_eq!(recorder.request_snapshot("r1").unwrap().path(), "/first");
}

#[test]
fn ending_unknown_or_ended_ids_is_a_no_op() {
    let recorder = verbose_recorder();
    assert!(recorder.end_request("never", 200, None).is_none());

    recorder.start_request("r1", "GET", "/").unwrap();
    assert!(recorder.end_request("r1", 200, None).is_some());
    assert!(recorder.end_request("r1", 200, None).is_none());
    assert!(recorder.end_request("r1", 500, None).is_none());
}

#[test]
fn ended_context_holds_events_in_emission_order() {
    let recorder = verbose_recorder();
    recorder.start_request("r1", "GET", "/").unwrap();
    for message in ["a", "b", "c"] {
        recorder
            .emit_with(Category::General, Severity::Info, message, None, Some("r1"))
            .unwrap();
    }
    let ctx = recorder.end_request("r1", 204, Some(0)).unwrap();

    let messages: Vec<_> = ctx.events().iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, vec!["a", "b", "c"]);
    assert_eq!(ctx.status(), Some(204));
    assert!(ctx.duration().unwrap() >= Duration::ZERO);
    assert!(ctx.is_finished());
}

#[test]
fn events_after_end_are_orphaned() {
    let recorder = verbose_recorder();
    recorder.start_request("r1", "GET", "/").unwrap();
    recorder.end_request("r1", 200, None);
    recorder
        .emit_with(Category::General, Severity::Info, "late", None, Some("r1"))
        .unwrap();

    assert_eq!(recorder.event_count(), 1);
    assert_eq!(recorder.stats().orphaned_events, 1);
}

#[test]
fn ids_can_be_reused_after_end() {
    let recorder = verbose_recorder();
    recorder.start_request("r1", "GET", "/").unwrap();
    recorder.end_request("r1", 200, None);
    recorder.start_request("r1", "GET", "/again").unwrap();
    assert_eq!(recorder.active_requests(), vec!["r1".to_string()]);
}

#[test]
fn metadata_reaches_the_report() {
    let debugger = Debugger::new(DebuggerConfig::default().with_call_context(false));
    let recorder = debugger.recorder();
    recorder.start_request("r1", "GET", "/").unwrap();
    recorder.set_metadata("r1", "user", json!("ada")).unwrap();
    assert!(recorder.set_metadata("ghost", "user", json!("x")).is_err());

    let report = debugger.finish_request("r1", 200, None).unwrap();
    assert_eq!(report.metadata.get("user"), Some(&json!("ada")));
}

#[test]
fn error_warn_info_scenario() {
    let debugger = Debugger::new(DebuggerConfig::default().with_call_context(false));
    let recorder = debugger.recorder();
    recorder.set_level(Severity::Info);
    recorder.start_request("r1", "GET", "/").unwrap();
    for severity in [Severity::Error, Severity::Warn, Severity::Info] {
        recorder
            .emit_with(Category::Controller, severity, severity.name(), None, Some("r1"))
            .unwrap();
    }

    let report = debugger.finish_request("r1", 200, None).unwrap();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.total_events, 3);
    assert_eq!(report.severity_count(Severity::Info), 1);
}
