//! Integration tests for request and performance reports
//!
//! Tests percentiles, slow and error lists, breakdowns, and history.

mod history;
mod performance;

use std::sync::Arc;
use std::time::Duration;

use lookout_debug::{DebuggerConfig, Recorder, RequestReport};

/// Builds a finished report whose duration is exactly `millis`.
pub fn report(recorder: &Recorder, id: &str, status: u16, millis: u64) -> Arc<RequestReport> {
    recorder.start_request(id, "GET", "/").unwrap();
    let ctx = recorder.end_request(id, status, None).unwrap();
    let end = ctx.start() + Duration::from_millis(millis);
    Arc::new(RequestReport::from_context(&ctx, status, end))
}

/// A recorder with default settings and no backtraces.
pub fn recorder() -> Recorder {
    Recorder::new(&DebuggerConfig::default().with_call_context(false))
}
