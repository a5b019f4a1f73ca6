//! A request driven through middleware, lifecycle hooks, breakpoints, and reports.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lookout::debug::{BreakpointAction, BreakpointSpec, DebuggerConfig, ReportFormatter, TextFormatter};
use lookout::foundation::{Category, LevelPreset, Severity};
use lookout::runtime::{Debugger, Exchange, Instrumentation, instrument_request, request_id};
use serde_json::{Value, json};

struct Exchange200 {
    path: String,
    locals: HashMap<String, Value>,
}

impl Exchange for Exchange200 {
    fn method(&self) -> &str {
        "GET"
    }

    fn url(&self) -> &str {
        &self.path
    }

    fn locals(&self) -> &HashMap<String, Value> {
        &self.locals
    }

    fn locals_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.locals
    }

    fn status(&self) -> u16 {
        200
    }

    fn response_size(&self) -> Option<u64> {
        Some(2)
    }
}

fn debugger() -> Debugger {
    Debugger::new(
        DebuggerConfig::default()
            .with_levels(LevelPreset::Development)
            .with_call_context(false),
    )
}

#[test]
fn middleware_and_hooks_share_one_request() {
    let debugger = debugger();
    let inst = Instrumentation::new(debugger.clone());
    let mut exchange = Exchange200 {
        path: "/users/7".into(),
        locals: HashMap::new(),
    };

    instrument_request(&debugger, &mut exchange, |x| {
        let id = json!(request_id(x).unwrap());
        inst.dispatch_named("db:query", &[id.clone(), json!("select * from users where id = 7")])?;
        inst.dispatch_named("db:result", &[id, json!(1)])?;
        Ok::<_, lookout::foundation::Error>(())
    })
    .unwrap();

    let report = debugger.reports().recent_requests(1).pop().unwrap();
    assert_eq!(report.path, "/users/7");
    assert_eq!(report.span_count, 1);
    assert_eq!(report.category_count(Category::Database), 2);
    assert_eq!(report.response_size, Some(2));
}

#[test]
fn concurrent_requests_stay_isolated() {
    let debugger = debugger();
    let workers: Vec<_> = (0..8)
        .map(|n| {
            let debugger = debugger.clone();
            thread::spawn(move || {
                let id = format!("r{n}");
                let recorder = debugger.recorder();
                recorder.start_request(&id, "GET", "/").unwrap();
                let span = recorder.start_timing("work", Category::Controller, Some(&id)).unwrap();
                for i in 0..=n {
                    recorder
                        .emit_with(Category::General, Severity::Info, format!("step {i}"), None, Some(&id))
                        .unwrap();
                }
                recorder.end_timing(&span).unwrap();
                debugger.finish_request(&id, 200, None).unwrap()
            })
        })
        .collect();

    for (n, worker) in workers.into_iter().enumerate() {
        let report = worker.join().unwrap();
        assert_eq!(report.request_id, format!("r{n}"));
        assert_eq!(report.total_events, n + 1);
        assert_eq!(report.span_count, 1);
    }
    assert_eq!(debugger.performance_report().total_requests, 8);
}

#[test]
fn paused_request_resumes_and_still_reports() {
    let debugger = debugger();
    debugger.breakpoints().add(
        BreakpointSpec::new("inspect checkout")
            .category(Category::Controller)
            .when(|event| event.message.contains("checkout"))
            .action(BreakpointAction::Pause),
    );

    let worker = {
        let debugger = debugger.clone();
        thread::spawn(move || {
            let recorder = debugger.recorder();
            recorder.start_request("r1", "POST", "/checkout").unwrap();
            recorder
                .emit_with(Category::Controller, Severity::Info, "checkout", None, Some("r1"))
                .unwrap();
            debugger.finish_request("r1", 200, None).unwrap()
        })
    };

    assert!(debugger.breakpoints().wait_for_pause(Duration::from_secs(5)));
    assert!(debugger.recorder().is_active("r1"));
    assert!(debugger.resume());

    let report: Arc<_> = worker.join().unwrap();
    assert_eq!(report.total_events, 1);
    assert!(!debugger.resume());
}

#[test]
fn text_report_renders_the_whole_story() {
    let debugger = debugger();
    let recorder = debugger.recorder();
    recorder.start_request("r1", "GET", "/slow").unwrap();
    let span = recorder.start_timing("render", Category::View, Some("r1")).unwrap();
    recorder.end_timing(&span).unwrap();
    recorder
        .emit_with(Category::View, Severity::Error, "template missing", None, Some("r1"))
        .unwrap();
    let report = debugger.finish_request("r1", 500, None).unwrap();

    let formatter = TextFormatter::new();
    let text = formatter.format_request_report(&report);
    assert!(text.starts_with("GET /slow -> 500"));
    assert!(text.contains("template missing"));

    let perf = formatter.format_performance_report(&debugger.performance_report());
    assert!(perf.contains("error rate: 100.0%"));
    assert!(perf.contains("view"));
}
