//! Pause and resume across threads.

use std::thread;
use std::time::Duration;

use lookout_debug::{BreakpointAction, BreakpointSpec};
use lookout_foundation::{Category, Severity};

use crate::debugger;

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn pause_blocks_until_resumed() {
    let debugger = debugger();
    debugger.breakpoints().add(
        BreakpointSpec::new("halt")
            .category(Category::Controller)
            .action(BreakpointAction::Pause),
    );

    let worker = {
        let debugger = debugger.clone();
        thread::spawn(move || {
            debugger.recorder().controller(Severity::Info, "about to pause");
            "released"
        })
    };

    assert!(debugger.breakpoints().wait_for_pause(WAIT));
    assert!(debugger.is_paused());
    let at = debugger.breakpoints().paused_at().unwrap();
    assert_eq!(at.name, "halt");
    assert_eq!(at.event.message, "about to pause");

    assert!(debugger.resume());
    assert_eq!(worker.join().unwrap(), "released");
    assert!(!debugger.is_paused());

    // Nothing is paused now.
    assert!(!debugger.resume());
}

#[test]
fn other_flows_keep_running_while_one_is_paused() {
    let debugger = debugger();
    debugger.breakpoints().add(
        BreakpointSpec::new("halt")
            .severity(Severity::Error)
            .action(BreakpointAction::Pause),
    );

    let worker = {
        let debugger = debugger.clone();
        thread::spawn(move || debugger.recorder().general(Severity::Error, "stop here"))
    };
    assert!(debugger.breakpoints().wait_for_pause(WAIT));

    debugger.recorder().general(Severity::Info, "unaffected");
    assert_eq!(debugger.recorder().event_count(), 2);

    debugger.resume();
    worker.join().unwrap();
}

#[test]
fn callback_can_resume_through_its_handle() {
    let debugger = debugger();
    let engine = debugger.breakpoints();
    engine.add(
        BreakpointSpec::new("halt")
            .category(Category::Security)
            .action(BreakpointAction::Pause),
    );
    engine.add(
        BreakpointSpec::new("release")
            .category(Category::Api)
            .action(BreakpointAction::callback(|_, handle| {
                handle.resume();
                Ok(())
            })),
    );

    let worker = {
        let debugger = debugger.clone();
        thread::spawn(move || debugger.recorder().security(Severity::Warn, "csrf mismatch"))
    };
    assert!(engine.wait_for_pause(WAIT));

    debugger.recorder().api(Severity::Info, "operator pressed continue");
    worker.join().unwrap();
    assert!(!engine.is_paused());
}
