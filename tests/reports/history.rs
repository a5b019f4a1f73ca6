//! Report history retention and queries.

use std::time::Duration;

use lookout_debug::{Debugger, DebuggerConfig, ReportAggregator};
use lookout_foundation::{Category, Severity};

use crate::recorder;

#[test]
fn shrinking_history_keeps_the_newest() {
    let recorder = recorder();
    let aggregator = ReportAggregator::with_max_history(10);
    for i in 0..5 {
        let id = format!("r{i}");
        recorder.start_request(&id, "GET", "/").unwrap();
        let ctx = recorder.end_request(&id, 200, None).unwrap();
        aggregator.generate_request_report(&ctx, 200, None);
    }

    aggregator.set_max_history(2);
    let ids: Vec<_> = aggregator.history().iter().map(|r| r.request_id.clone()).collect();
    assert_eq!(ids, vec!["r3", "r4"]);
}

#[test]
fn overflow_evicts_oldest_first() {
    let debugger = Debugger::new(DebuggerConfig::default().with_max_history(3));
    for i in 0..7 {
        let id = format!("r{i}");
        debugger.recorder().start_request(&id, "GET", "/").unwrap();
        debugger.finish_request(&id, 200, None).unwrap();
    }
    let reports = debugger.reports();
    assert_eq!(reports.len(), 3);
    assert!(reports.find("r3").is_none());
    assert!(reports.find("r4").is_some());
}

#[test]
fn report_lists_slowest_span_anywhere_in_tree() {
    let debugger = Debugger::new(DebuggerConfig::default().with_call_context(false));
    let recorder = debugger.recorder();
    recorder.start_request("r1", "GET", "/").unwrap();
    let outer = recorder.start_timing("controller", Category::Controller, Some("r1")).unwrap();
    let quick = recorder.start_timing("quick", Category::Cache, Some("r1")).unwrap();
    recorder.end_timing(&quick).unwrap();
    let query = recorder.start_timing("query", Category::Database, Some("r1")).unwrap();
    std::thread::sleep(Duration::from_millis(3));
    recorder.end_timing(&query).unwrap();
    recorder.end_timing(&outer).unwrap();
    recorder
        .emit_with(Category::Database, Severity::Warn, "slow query", None, Some("r1"))
        .unwrap();

    let report = debugger.finish_request("r1", 200, None).unwrap();
    // The enclosing controller span is at least as long as the query.
    assert_eq!(report.slowest_operation.as_ref().unwrap().name, "controller");
    assert_eq!(report.span_count, 3);
    assert_eq!(report.category_timings[&Category::Database].calls, 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.category_count(Category::Database), 1);
}

#[test]
fn slow_and_error_queries_on_history() {
    let aggregator = ReportAggregator::default();
    let recorder = recorder();
    for (id, status, millis) in [("ok", 200, 5), ("missing", 404, 80), ("broken", 500, 300)] {
        recorder.start_request(id, "GET", "/").unwrap();
        let ctx = recorder.end_request(id, status, None).unwrap();
        aggregator.generate_request_report(&ctx, status, Some(ctx.start() + Duration::from_millis(millis)));
    }

    assert_eq!(aggregator.slow_requests(Duration::from_millis(50)).len(), 2);
    let errors: Vec<_> = aggregator.error_requests().iter().map(|r| r.status).collect();
    assert_eq!(errors, vec![404, 500]);
    assert_eq!(aggregator.recent_requests(2).len(), 2);
}
