//! The process-wide debugger.

use lookout_debug::DebuggerConfig;
use lookout_foundation::Severity;
use lookout_runtime::{Debugger, global};

// Every test in this binary shares the cell, so all checks live in one test.
#[test]
fn install_then_use_everywhere() {
    let installed = global::install(Debugger::new(DebuggerConfig::default().with_max_history(3)));
    assert!(installed.is_ok());
    assert!(global::install(Debugger::default()).is_err());

    let debugger = global::try_debugger().unwrap();
    assert_eq!(debugger.config().max_history, 3);

    global::recorder().general(Severity::Info, "from anywhere");
    assert_eq!(global::debugger().recorder().event_count(), 1);
}
