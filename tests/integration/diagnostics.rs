//! Diagnostics the engines emit through `tracing`.

use std::sync::{Arc, Mutex};

use tracing::{Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

use lookout::debug::{Debugger, DebuggerConfig};
use lookout::foundation::Category;

type Seen = Arc<Mutex<Vec<(String, Level)>>>;

/// Records the target and level of every diagnostic.
struct CaptureLayer(Seen);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        self.0
            .lock()
            .unwrap()
            .push((meta.target().to_string(), *meta.level()));
    }
}

fn captured(f: impl FnOnce()) -> Vec<(String, Level)> {
    let seen = Seen::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(Arc::clone(&seen)));
    tracing::subscriber::with_default(subscriber, f);
    seen.lock().unwrap().clone()
}

#[test]
fn force_closed_span_warns() {
    let debugger = Debugger::new(DebuggerConfig::default().with_call_context(false));
    let entries = captured(|| {
        let recorder = debugger.recorder();
        recorder.start_request("r1", "GET", "/").unwrap();
        recorder.start_timing("leaked", Category::Database, Some("r1")).unwrap();
        debugger.finish_request("r1", 200, None).unwrap();
    });

    assert!(
        entries
            .iter()
            .any(|(target, level)| target == "lookout::recorder" && *level == Level::WARN)
    );
    assert!(entries.iter().any(|(target, _)| target == "lookout::report"));
}

#[test]
fn duplicate_start_warns() {
    let debugger = Debugger::default();
    let entries = captured(|| {
        let recorder = debugger.recorder();
        recorder.start_request("r1", "GET", "/").unwrap();
        let _ = recorder.start_request("r1", "GET", "/");
    });
    assert_eq!(
        entries
            .iter()
            .filter(|(target, level)| target == "lookout::recorder" && *level == Level::WARN)
            .count(),
        1
    );
}
