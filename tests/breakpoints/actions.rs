//! Inspect and callback actions, and the inspect presets.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lookout_debug::{
    ActionKind, BreakpointAction, BreakpointHit, BreakpointSpec, EventBuilder, HookResult, ResumeHandle, presets,
};
use lookout_foundation::{Category, Severity};
use serde_json::json;

use crate::debugger;

#[test]
fn inspect_captures_payload() {
    let debugger = debugger();
    presets::break_on_error(debugger.breakpoints());
    debugger
        .recorder()
        .record(
            EventBuilder::new(Category::Database, Severity::Error, "deadlock")
                .payload(json!({"table": "orders"})),
        )
        .unwrap();

    let inspection = debugger.breakpoints().last_inspection().unwrap();
    assert_eq!(inspection.hit.action, ActionKind::Inspect);
    assert!(inspection.payload.unwrap().contains("orders"));
    assert!(inspection.call_context.is_none());
}

#[test]
fn slow_preset_uses_strict_threshold() {
    let debugger = debugger();
    let id = presets::break_on_slow(debugger.breakpoints(), Duration::from_millis(100));
    let recorder = debugger.recorder();
    for millis in [50, 100, 150] {
        recorder
            .record(
                EventBuilder::new(Category::Database, Severity::Info, "query")
                    .duration(Duration::from_millis(millis)),
            )
            .unwrap();
    }
    assert_eq!(debugger.breakpoints().get(id).unwrap().hit_count(), 1);
}

#[test]
fn auth_failure_preset() {
    let debugger = debugger();
    let id = presets::break_on_auth_failure(debugger.breakpoints());
    let recorder = debugger.recorder();
    recorder.auth(Severity::Warn, "Login FAILED for ada");
    recorder.auth(Severity::Info, "login ok for ada");
    recorder.general(Severity::Warn, "failed to warm cache");
    assert_eq!(debugger.breakpoints().get(id).unwrap().hit_count(), 1);
}

#[test]
fn callback_receives_hit_and_count() {
    let debugger = debugger();
    let last = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&last);
    debugger.breakpoints().add(
        BreakpointSpec::new("count")
            .category(Category::Jobs)
            .action(BreakpointAction::callback(
                move |hit: &BreakpointHit, _: ResumeHandle| -> HookResult {
                    seen.store(hit.hit_count, Ordering::SeqCst);
                    Ok(())
                },
            )),
    );

    for _ in 0..3 {
        debugger.recorder().jobs(Severity::Info, "tick");
    }
    assert_eq!(last.load(Ordering::SeqCst), 3);
}

#[test]
fn panicking_callback_becomes_a_fault() {
    let debugger = debugger();
    debugger.breakpoints().add(
        BreakpointSpec::new("explodes").action(BreakpointAction::callback(
            |_: &BreakpointHit, _: ResumeHandle| -> HookResult { panic!("callback blew up") },
        )),
    );
    debugger.recorder().general(Severity::Info, "x");

    let faults = debugger.faults().drain();
    assert_eq!(faults.len(), 1);
    assert!(faults[0].panicked);
    assert_eq!(debugger.recorder().event_count(), 1);
}
