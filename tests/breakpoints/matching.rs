//! Breakpoint filters, conditions, and hit counting.

use lookout_debug::{BreakpointSpec, HookError, presets};
use lookout_foundation::{Category, ErrorKind, Severity};

use crate::debugger;

#[test]
fn max_hits_of_one_triggers_once() {
    let debugger = debugger();
    let id = debugger
        .breakpoints()
        .add(BreakpointSpec::new("once").category(Category::Cache).max_hits(1));

    for _ in 0..10 {
        debugger.recorder().cache(Severity::Info, "hit");
    }

    let bp = debugger.breakpoints().get(id).unwrap();
    assert_eq!(bp.hit_count(), 1);
    assert!(bp.is_exhausted());
    assert_eq!(debugger.breakpoints().hits().len(), 1);
}

#[test]
fn uncapped_hit_count_equals_matches() {
    let debugger = debugger();
    let id = debugger.breakpoints().add(BreakpointSpec::new("all"));
    for n in 0..25 {
        debugger.recorder().general(Severity::Info, format!("event {n}"));
    }
    assert_eq!(debugger.breakpoints().get(id).unwrap().hit_count(), 25);
}

#[test]
fn category_and_severity_filters_combine() {
    let debugger = debugger();
    let id = debugger.breakpoints().add(
        BreakpointSpec::new("db errors")
            .category(Category::Database)
            .severities([Severity::Error, Severity::Warn]),
    );
    let recorder = debugger.recorder();
    recorder.database(Severity::Error, "refused");
    recorder.database(Severity::Info, "connected");
    recorder.cache(Severity::Error, "evicted");
    recorder.database(Severity::Warn, "slow");

    assert_eq!(debugger.breakpoints().get(id).unwrap().hit_count(), 2);
}

#[test]
fn disabled_breakpoints_do_not_count() {
    let debugger = debugger();
    let engine = debugger.breakpoints();
    let id = engine.add(BreakpointSpec::new("toggled"));

    engine.disable(id).unwrap();
    debugger.recorder().general(Severity::Info, "ignored");
    assert_eq!(engine.get(id).unwrap().hit_count(), 0);

    assert!(engine.toggle(id).unwrap());
    debugger.recorder().general(Severity::Info, "counted");
    assert_eq!(engine.get(id).unwrap().hit_count(), 1);
}

#[test]
fn unknown_ids_are_errors() {
    let debugger = debugger();
    let engine = debugger.breakpoints();
    let id = engine.add(BreakpointSpec::new("gone"));
    assert!(engine.remove(id));
    assert!(!engine.remove(id));

    let err = engine.enable(id).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownBreakpoint(_)));
}

#[test]
fn failing_condition_is_skipped_and_reported() {
    let debugger = debugger();
    let engine = debugger.breakpoints();
    let broken = engine.add(BreakpointSpec::new("broken").condition(|_| Err(HookError::new("bad predicate"))));
    let fine = engine.add(BreakpointSpec::new("fine"));

    debugger.recorder().general(Severity::Info, "x");

    assert_eq!(engine.get(broken).unwrap().hit_count(), 0);
    assert_eq!(engine.get(fine).unwrap().hit_count(), 1);
    let faults = debugger.faults().drain();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].message, "bad predicate");
}

#[test]
fn breakpoints_run_in_insertion_order() {
    let debugger = debugger();
    let engine = debugger.breakpoints();
    let first = engine.add(BreakpointSpec::new("first"));
    let second = engine.add(BreakpointSpec::new("second"));
    debugger.recorder().general(Severity::Info, "x");

    let order: Vec<_> = engine.hits().iter().map(|h| h.breakpoint_id).collect();
    assert_eq!(order, vec![first, second]);
}

#[test]
fn message_pattern_preset() {
    let debugger = debugger();
    let engine = debugger.breakpoints();
    let id = presets::break_on_message_pattern(engine, r"^GET /admin", Default::default()).unwrap();

    debugger.recorder().transport(Severity::Info, "GET /admin/users");
    debugger.recorder().transport(Severity::Info, "GET /home");
    assert_eq!(engine.get(id).unwrap().hit_count(), 1);

    assert!(presets::break_on_message_pattern(engine, "(unclosed", Default::default()).is_err());
}

#[test]
fn request_id_preset() {
    let debugger = debugger();
    let recorder = debugger.recorder();
    let id = presets::break_on_request_id(debugger.breakpoints(), "r2", Default::default());
    for request in ["r1", "r2"] {
        recorder.start_request(request, "GET", "/").unwrap();
        recorder
            .emit_with(Category::General, Severity::Info, "work", None, Some(request))
            .unwrap();
    }
    assert_eq!(debugger.breakpoints().get(id).unwrap().hit_count(), 1);
}
