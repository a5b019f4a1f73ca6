//! The request middleware against a minimal exchange.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use lookout_debug::DebuggerConfig;
use lookout_runtime::{Debugger, Exchange, REQUEST_ID_KEY, RequestScope, instrument_request, request_id};
use serde_json::Value;

struct Exchange404 {
    locals: HashMap<String, Value>,
    status: u16,
}

impl Exchange for Exchange404 {
    fn method(&self) -> &str {
        "GET"
    }

    fn url(&self) -> &str {
        "/missing"
    }

    fn locals(&self) -> &HashMap<String, Value> {
        &self.locals
    }

    fn locals_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.locals
    }

    fn status(&self) -> u16 {
        self.status
    }
}

fn debugger() -> Debugger {
    Debugger::new(DebuggerConfig::default().with_call_context(false))
}

#[test]
fn each_call_gets_a_fresh_id() {
    let debugger = debugger();
    let mut exchange = Exchange404 {
        locals: HashMap::new(),
        status: 404,
    };

    let mut ids = Vec::new();
    for _ in 0..3 {
        instrument_request(&debugger, &mut exchange, |x| {
            ids.push(request_id(x).unwrap().to_string());
            Ok::<_, String>(())
        })
        .unwrap();
    }
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert_eq!(debugger.reports().error_requests().len(), 3);
}

#[test]
fn error_status_is_kept_when_handler_fails() {
    let debugger = debugger();
    let mut exchange = Exchange404 {
        locals: HashMap::new(),
        status: 404,
    };
    let result = instrument_request(&debugger, &mut exchange, |_| Err::<(), _>("not found"));
    assert!(result.is_err());
    assert!(exchange.locals.contains_key(REQUEST_ID_KEY));
    assert!(debugger.reports().is_empty());
    assert!(debugger.recorder().active_requests().is_empty());
}

#[test]
fn scope_survives_a_panicking_handler() {
    let debugger = debugger();
    let handle = debugger.clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
        let _scope = RequestScope::begin_with_id(&handle, "r1", "GET", "/").unwrap();
        panic!("handler crashed");
    }));
    assert!(outcome.is_err());
    assert!(!debugger.recorder().is_active("r1"));
}
