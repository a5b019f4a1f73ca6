//! Event emission, level gating, buffer queries, and listeners.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lookout_debug::{DebuggerConfig, Event, EventBuilder, HookError, HookResult, Recorder};
use lookout_foundation::{Category, LevelPreset, Severity};
use serde_json::json;

use crate::verbose_recorder;

// =============================================================================
// Level Gating
// =============================================================================

#[test]
fn events_below_threshold_are_dropped() {
    let recorder = verbose_recorder();
    recorder.set_level(Severity::Warn);

    recorder.database(Severity::Error, "refused");
    recorder.database(Severity::Warn, "slow");
    recorder.database(Severity::Info, "connected");

    assert_eq!(recorder.event_count(), 2);
    assert_eq!(recorder.stats().events_filtered, 1);
}

#[test]
fn category_override_beats_global() {
    let recorder = verbose_recorder();
    recorder.set_level(Severity::Error);
    recorder.set_category_level(Category::Cache, Severity::Trace);

    recorder.cache(Severity::Trace, "get user:1");
    recorder.auth(Severity::Warn, "token expiring");
    assert_eq!(recorder.event_count(), 1);

    recorder.clear_category_level(Category::Cache);
    recorder.cache(Severity::Trace, "get user:2");
    assert_eq!(recorder.event_count(), 1);
}

#[test]
fn off_disables_errors() {
    let recorder = verbose_recorder();
    recorder.apply_preset(LevelPreset::Silent);
    recorder.general(Severity::Error, "nobody hears this");
    assert_eq!(recorder.event_count(), 0);
}

#[test]
fn disabled_recorder_keeps_tracking_requests() {
    let recorder = verbose_recorder();
    recorder.disable();
    recorder.start_request("r1", "GET", "/").unwrap();
    recorder.general(Severity::Error, "dropped");

    assert_eq!(recorder.event_count(), 0);
    assert!(recorder.is_active("r1"));
    recorder.enable();
    assert!(recorder.is_enabled());
}

// =============================================================================
// Buffer Queries
// =============================================================================

#[test]
fn ring_buffer_evicts_oldest() {
    let recorder = Recorder::new(&DebuggerConfig::default().with_event_buffer_size(3));
    for i in 0..5 {
        recorder.general(Severity::Info, format!("e{i}"));
    }
    let messages: Vec<_> = recorder
        .recent_events(10)
        .iter()
        .map(|e| e.message.clone())
        .collect();
    assert_eq!(messages, vec!["e2", "e3", "e4"]);
}

#[test]
fn queries_filter_by_category_severity_and_request() {
    let recorder = verbose_recorder();
    recorder.start_request("r1", "GET", "/").unwrap();
    recorder
        .emit_with(Category::Database, Severity::Debug, "select", Some(json!({"rows": 1})), Some("r1"))
        .unwrap();
    recorder.view(Severity::Info, "rendered");
    recorder.database(Severity::Error, "refused");

    assert_eq!(recorder.events_by_category(Category::Database).len(), 2);
    assert_eq!(recorder.events_by_severity(Severity::Error).len(), 1);
    assert_eq!(recorder.events_for_request("r1").len(), 1);
    assert_eq!(
        recorder.filter_events(|e| e.payload_field("rows").is_some()).len(),
        1
    );
}

#[test]
fn event_ids_increase_in_record_order() {
    let recorder = verbose_recorder();
    let a = recorder
        .record(EventBuilder::new(Category::General, Severity::Info, "a"))
        .unwrap()
        .unwrap();
    let b = recorder
        .record(EventBuilder::new(Category::General, Severity::Info, "b"))
        .unwrap()
        .unwrap();
    assert!(b.id > a.id);
}

#[test]
fn empty_request_id_is_rejected() {
    let recorder = verbose_recorder();
    assert!(
        recorder
            .emit_with(Category::General, Severity::Info, "x", None, Some(""))
            .is_err()
    );
    assert_eq!(recorder.event_count(), 0);
}

// =============================================================================
// Listeners
// =============================================================================

#[test]
fn listeners_see_every_recorded_event() {
    let recorder = verbose_recorder();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let id = recorder.add_listener(move |_: &Event| -> HookResult {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    recorder.general(Severity::Info, "one");
    recorder.general(Severity::Info, "two");
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    assert!(recorder.remove_listener(id));
    recorder.general(Severity::Info, "three");
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[test]
fn failing_listener_does_not_stop_the_others() {
    let recorder = verbose_recorder();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    recorder.add_listener(|_: &Event| -> HookResult { Err(HookError::new("broken")) });
    recorder.add_listener(|_: &Event| -> HookResult { panic!("worse") });
    recorder.add_listener(move |_: &Event| -> HookResult {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    recorder.general(Severity::Info, "still recorded");

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.event_count(), 1);
    assert_eq!(recorder.faults().drain().len(), 2);
}
