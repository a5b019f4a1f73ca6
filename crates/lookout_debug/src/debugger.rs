//! The recorder, breakpoint engine, and report aggregator wired together.

use std::sync::Arc;

use crate::breakpoint::BreakpointEngine;
use crate::config::DebuggerConfig;
use crate::fault::FaultChannel;
use crate::recorder::Recorder;
use crate::report::{PerformanceReport, ReportAggregator, RequestReport};

/// A recorder with an attached breakpoint engine and a report aggregator.
///
/// All three report faults into one shared channel. Cloning is cheap and
/// every clone drives the same engines.
#[derive(Clone, Debug)]
pub struct Debugger {
    config: DebuggerConfig,
    faults: FaultChannel,
    recorder: Arc<Recorder>,
    breakpoints: Arc<BreakpointEngine>,
    reports: Arc<ReportAggregator>,
}

impl Debugger {
    /// Creates a debugger from a configuration.
    #[must_use]
    pub fn new(config: DebuggerConfig) -> Self {
        let faults = FaultChannel::new(config.fault_capacity);
        let recorder = Arc::new(Recorder::with_faults(&config, faults.clone()));
        let breakpoints = Arc::new(BreakpointEngine::with_faults(&config, faults.clone()));
        recorder.attach_breakpoints(Arc::clone(&breakpoints));
        let reports = Arc::new(ReportAggregator::new(&config));
        Self {
            config,
            faults,
            recorder,
            breakpoints,
            reports,
        }
    }

    /// Returns the configuration the debugger was built with.
    #[must_use]
    pub const fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    /// Returns the recorder.
    #[must_use]
    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    /// Returns the breakpoint engine.
    #[must_use]
    pub fn breakpoints(&self) -> &Arc<BreakpointEngine> {
        &self.breakpoints
    }

    /// Returns the report aggregator.
    #[must_use]
    pub fn reports(&self) -> &Arc<ReportAggregator> {
        &self.reports
    }

    /// Returns the shared fault channel.
    #[must_use]
    pub const fn faults(&self) -> &FaultChannel {
        &self.faults
    }

    /// Ends a request and files its report.
    ///
    /// Returns `None` if the request was not in flight.
    pub fn finish_request(
        &self,
        id: &str,
        status: u16,
        response_size: Option<u64>,
    ) -> Option<Arc<RequestReport>> {
        let context = self.recorder.end_request(id, status, response_size)?;
        Some(
            self.reports
                .generate_request_report(&context, status, context.end()),
        )
    }

    /// Summarizes the report history.
    #[must_use]
    pub fn performance_report(&self) -> PerformanceReport {
        self.reports.generate_performance_report(None)
    }

    /// Releases any flow paused by a breakpoint. Returns false if none was.
    pub fn resume(&self) -> bool {
        self.breakpoints.resume()
    }

    /// Returns true while a flow is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.breakpoints.is_paused()
    }
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new(DebuggerConfig::default())
    }
}
