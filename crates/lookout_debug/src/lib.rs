//! Event recording, request timing, breakpoints, and performance reports for Lookout.
//!
//! This crate provides:
//! - [`Recorder`] - Level-gated event recording, per-request timing trees, listeners
//! - [`BreakpointEngine`] - Conditional breakpoints with log, inspect, pause, and callback actions
//! - [`ReportAggregator`] - Per-request reports and percentile performance breakdowns
//! - [`Debugger`] - The three wired together around one fault channel
//!
//! All engine types are `Send + Sync` and meant to be shared behind an `Arc`
//! by many in-flight requests at once.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod breakpoint;
pub mod config;
pub mod debugger;
pub mod event;
pub mod fault;
pub mod format;
pub mod recorder;
pub mod report;
pub mod request;

pub use breakpoint::{
    ActionKind, Breakpoint, BreakpointAction, BreakpointCallback, BreakpointEngine, BreakpointHit,
    BreakpointId, BreakpointSpec, Condition, Inspection, PauseLatch, PausedAt, ResumeHandle,
    presets,
};
pub use config::DebuggerConfig;
pub use debugger::Debugger;
pub use event::{Event, EventBuffer, EventBufferStats, EventBuilder, EventId};
pub use fault::{Fault, FaultChannel, FaultSource, HookError, HookResult};
pub use format::{ReportFormatter, TextFormatter};
pub use recorder::{EventListener, ListenerId, Recorder, RecorderStats};
pub use report::{
    CategoryTiming, ModuleTiming, PerformanceReport, ReportAggregator, ReportHistory,
    RequestReport, SlowestOperation, percentile,
};
pub use request::{RequestContext, SpanHandle, SpanId, SpanTree, TimingSpan};
