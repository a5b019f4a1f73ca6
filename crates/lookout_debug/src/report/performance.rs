//! Aggregate performance reports over many requests.
//!
//! Percentiles use the nearest-rank method: for `n` sorted durations the
//! p-th percentile is the value at index `ceil(p * n / 100) - 1`, clamped to
//! `[0, n - 1]`. No interpolation is done, so P95 of
//! `[10, 20, 30, 40, 100]` ms is 100 ms, not 88 ms.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use lookout_foundation::Category;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{CategoryTiming, RequestReport, average};

/// Number of requests kept in the slow and error lists.
const TOP_REQUESTS: usize = 10;

/// Returns the p-th percentile of ascending `sorted` durations (nearest rank).
///
/// Returns zero for an empty slice.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let n = sorted.len();
    // Multiplying before dividing keeps p = 50, n = 10 at exactly 5.0.
    let rank = (p * n as f64 / 100.0).ceil() as usize;
    sorted[rank.saturating_sub(1).min(n - 1)]
}

/// Span time for one category across a set of requests.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ModuleTiming {
    /// The category.
    pub category: Category,
    /// Total span time.
    pub total: Duration,
    /// Number of spans.
    pub calls: u64,
    /// Mean span time.
    pub average: Duration,
    /// Share of the total span time across all categories, 0 to 100.
    pub percentage: f64,
}

/// Performance summary over a set of request reports.
#[derive(Clone, Debug, Default)]
pub struct PerformanceReport {
    /// Number of requests.
    pub total_requests: usize,
    /// Mean request duration.
    pub average_duration: Duration,
    /// Shortest request.
    pub min_duration: Duration,
    /// Longest request.
    pub max_duration: Duration,
    /// Median duration.
    pub p50: Duration,
    /// 95th percentile duration.
    pub p95: Duration,
    /// 99th percentile duration.
    pub p99: Duration,
    /// The up to ten longest requests above P95, longest first.
    pub slow_requests: Vec<Arc<RequestReport>>,
    /// The up to ten most recent requests with status 400 or above, newest first.
    pub error_requests: Vec<Arc<RequestReport>>,
    /// Fraction of requests with status 400 or above, 0 to 1.
    pub error_rate: f64,
    /// Span time per category, largest total first.
    pub module_breakdown: Vec<ModuleTiming>,
}

impl PerformanceReport {
    /// Aggregates reports given in chronological order.
    ///
    /// An empty slice yields the all-zero report.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_reports(reports: &[Arc<RequestReport>]) -> Self {
        if reports.is_empty() {
            return Self::default();
        }

        let mut durations: Vec<Duration> = reports.iter().map(|r| r.duration).collect();
        durations.sort_unstable();
        let total: Duration = durations.iter().sum();
        let p95 = percentile(&durations, 95.0);

        let mut slow_requests: Vec<_> = reports
            .iter()
            .filter(|r| r.duration > p95)
            .cloned()
            .collect();
        slow_requests.sort_by(|a, b| b.duration.cmp(&a.duration));
        slow_requests.truncate(TOP_REQUESTS);

        let error_count = reports.iter().filter(|r| r.is_error()).count();
        let error_requests = reports
            .iter()
            .rev()
            .filter(|r| r.is_error())
            .take(TOP_REQUESTS)
            .cloned()
            .collect();

        Self {
            total_requests: reports.len(),
            average_duration: average(total, reports.len() as u64),
            min_duration: durations[0],
            max_duration: durations[durations.len() - 1],
            p50: percentile(&durations, 50.0),
            p95,
            p99: percentile(&durations, 99.0),
            slow_requests,
            error_requests,
            error_rate: error_count as f64 / reports.len() as f64,
            module_breakdown: module_breakdown(reports),
        }
    }

    /// Returns the breakdown entry for a category.
    #[must_use]
    pub fn module(&self, category: Category) -> Option<&ModuleTiming> {
        self.module_breakdown.iter().find(|m| m.category == category)
    }
}

fn module_breakdown(reports: &[Arc<RequestReport>]) -> Vec<ModuleTiming> {
    let mut totals: BTreeMap<Category, CategoryTiming> = BTreeMap::new();
    for report in reports {
        for (category, timing) in &report.category_timings {
            totals.entry(*category).or_default().merge(timing);
        }
    }

    let grand_total: Duration = totals.values().map(|t| t.total).sum();
    let grand_secs = grand_total.as_secs_f64();

    let mut breakdown: Vec<ModuleTiming> = totals
        .into_iter()
        .filter(|(_, timing)| !timing.total.is_zero())
        .map(|(category, timing)| ModuleTiming {
            category,
            total: timing.total,
            calls: timing.calls,
            average: timing.average(),
            percentage: if grand_secs > 0.0 {
                timing.total.as_secs_f64() / grand_secs * 100.0
            } else {
                0.0
            },
        })
        .collect();
    breakdown.sort_by(|a, b| b.total.cmp(&a.total));
    breakdown
}
