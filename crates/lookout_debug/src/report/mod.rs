//! Request reports and performance aggregation.
//!
//! [`ReportAggregator`] turns finished request contexts into
//! [`RequestReport`]s, keeps a capped history of them, and summarizes any set
//! of reports into a [`PerformanceReport`].

pub mod history;
pub mod performance;
pub mod request;

pub use history::ReportHistory;
pub use performance::{ModuleTiming, PerformanceReport, percentile};
pub use request::{CategoryTiming, RequestReport, SlowestOperation};

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::config::DebuggerConfig;
use crate::request::RequestContext;

/// Mean of `count` samples summing to `total`; zero when `count` is zero.
pub(crate) fn average(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(count);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

// =============================================================================
// Report Aggregator
// =============================================================================

/// Builds request reports and keeps their history.
#[derive(Debug)]
pub struct ReportAggregator {
    history: Mutex<ReportHistory>,
}

impl ReportAggregator {
    /// Creates an aggregator retaining `config.max_history` reports.
    #[must_use]
    pub fn new(config: &DebuggerConfig) -> Self {
        Self::with_max_history(config.max_history)
    }

    /// Creates an aggregator retaining `max_history` reports.
    #[must_use]
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            history: Mutex::new(ReportHistory::new(max_history)),
        }
    }

    /// Builds a report for a request and appends it to the history.
    ///
    /// The end time is `end` if given, else the context's own end, else now.
    /// The report is returned even if a zero-capacity history did not keep it.
    pub fn generate_request_report(
        &self,
        context: &RequestContext,
        status: u16,
        end: Option<Instant>,
    ) -> Arc<RequestReport> {
        let end = end.or(context.end()).unwrap_or_else(Instant::now);
        let report = Arc::new(RequestReport::from_context(context, status, end));
        debug!(
            target: "lookout::report",
            request = %report.request_id,
            status,
            duration_ms = report.duration.as_secs_f64() * 1000.0,
            events = report.total_events,
            "request report generated"
        );
        self.history.lock().push(Arc::clone(&report));
        report
    }

    /// Summarizes `reports`, or the whole history when `None`.
    #[must_use]
    pub fn generate_performance_report(
        &self,
        reports: Option<&[Arc<RequestReport>]>,
    ) -> PerformanceReport {
        match reports {
            Some(reports) => PerformanceReport::from_reports(reports),
            None => PerformanceReport::from_reports(&self.history()),
        }
    }

    /// Returns the retained reports, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Arc<RequestReport>> {
        self.history.lock().to_vec()
    }

    /// Returns the N most recent reports, oldest first.
    #[must_use]
    pub fn recent_requests(&self, count: usize) -> Vec<Arc<RequestReport>> {
        self.history.lock().recent(count).cloned().collect()
    }

    /// Returns retained reports slower than `threshold`.
    #[must_use]
    pub fn slow_requests(&self, threshold: Duration) -> Vec<Arc<RequestReport>> {
        self.history
            .lock()
            .iter()
            .filter(|r| r.duration > threshold)
            .cloned()
            .collect()
    }

    /// Returns retained reports with status 400 or above.
    #[must_use]
    pub fn error_requests(&self) -> Vec<Arc<RequestReport>> {
        self.history
            .lock()
            .iter()
            .filter(|r| r.is_error())
            .cloned()
            .collect()
    }

    /// Returns the latest retained report for a request id.
    #[must_use]
    pub fn find(&self, request_id: &str) -> Option<Arc<RequestReport>> {
        self.history.lock().get(request_id).cloned()
    }

    /// Drops every retained report.
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Changes the history cap, evicting the oldest reports immediately.
    pub fn set_max_history(&self, max_history: usize) {
        self.history.lock().set_capacity(max_history);
    }

    /// Returns the history cap.
    #[must_use]
    pub fn max_history(&self) -> usize {
        self.history.lock().capacity()
    }

    /// Returns the number of retained reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    /// Returns true if no report is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.lock().is_empty()
    }
}

impl Default for ReportAggregator {
    fn default() -> Self {
        Self::new(&DebuggerConfig::default())
    }
}

// =============================================================================
// Tests
// =============================================================================
