//! Integration tests for the event recorder
//!
//! Tests level gating, request tracking, timing trees, and listeners.

mod events;
mod requests;

use lookout_debug::{DebuggerConfig, Recorder};
use lookout_foundation::LevelPreset;

/// A recorder that keeps everything and skips backtraces.
pub fn verbose_recorder() -> Recorder {
    Recorder::new(
        &DebuggerConfig::default()
            .with_levels(LevelPreset::Verbose)
            .with_call_context(false),
    )
}
