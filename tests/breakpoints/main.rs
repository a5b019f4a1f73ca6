//! Integration tests for the breakpoint engine
//!
//! Tests matching, hit caps, actions, presets, and pause/resume.

mod actions;
mod matching;
mod pause;

use lookout_debug::{Debugger, DebuggerConfig};
use lookout_foundation::LevelPreset;

/// A debugger that records everything and skips backtraces.
pub fn debugger() -> Debugger {
    Debugger::new(
        DebuggerConfig::default()
            .with_levels(LevelPreset::Verbose)
            .with_call_context(false),
    )
}
