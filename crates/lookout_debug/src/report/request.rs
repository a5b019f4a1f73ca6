//! Per-request reports.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use lookout_foundation::{Category, Severity};
use serde_json::Value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::request::RequestContext;

/// The longest span of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlowestOperation {
    /// Span name.
    pub name: String,
    /// Span category.
    pub category: Category,
    /// Span duration.
    pub duration: Duration,
}

/// Summed span time for one category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CategoryTiming {
    /// Total time across spans, nested spans included.
    pub total: Duration,
    /// Number of spans.
    pub calls: u64,
}

impl CategoryTiming {
    /// Returns the mean span duration.
    #[must_use]
    pub fn average(&self) -> Duration {
        super::average(self.total, self.calls)
    }

    pub(crate) fn add(&mut self, duration: Duration) {
        self.total += duration;
        self.calls += 1;
    }

    pub(crate) fn merge(&mut self, other: &Self) {
        self.total += other.total;
        self.calls += other.calls;
    }
}

/// Summary of one finished request.
#[derive(Clone, Debug)]
pub struct RequestReport {
    /// Request id.
    pub request_id: String,
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Response status.
    pub status: u16,
    /// Wall-clock start.
    pub started_at: SystemTime,
    /// Time from request start to the report's end time.
    pub duration: Duration,
    /// Response size, if reported.
    pub response_size: Option<u64>,
    /// Number of events the request emitted.
    pub total_events: usize,
    /// Event counts per severity.
    pub severity_counts: BTreeMap<Severity, usize>,
    /// Event counts per category.
    pub category_counts: BTreeMap<Category, usize>,
    /// The `Error` events, in emission order.
    pub errors: Vec<Arc<Event>>,
    /// The `Warn` events, in emission order.
    pub warnings: Vec<Arc<Event>>,
    /// The longest span anywhere in the forest.
    pub slowest_operation: Option<SlowestOperation>,
    /// Number of spans.
    pub span_count: usize,
    /// Summed span time per category.
    pub category_timings: BTreeMap<Category, CategoryTiming>,
    /// Metadata attached while the request was in flight.
    pub metadata: BTreeMap<String, Value>,
}

impl RequestReport {
    /// Builds a report from a request context.
    ///
    /// The duration runs from the context's start to `end`, saturating at zero.
    #[must_use]
    pub fn from_context(context: &RequestContext, status: u16, end: Instant) -> Self {
        let mut severity_counts = BTreeMap::new();
        let mut category_counts = BTreeMap::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        for event in context.events() {
            *severity_counts.entry(event.severity).or_insert(0) += 1;
            *category_counts.entry(event.category).or_insert(0) += 1;
            match event.severity {
                Severity::Error => errors.push(Arc::clone(event)),
                Severity::Warn => warnings.push(Arc::clone(event)),
                _ => {}
            }
        }

        let spans = context.spans();
        let mut category_timings: BTreeMap<Category, CategoryTiming> = BTreeMap::new();
        for (_, span) in spans.walk() {
            if let Some(duration) = span.duration() {
                category_timings
                    .entry(span.category())
                    .or_default()
                    .add(duration);
            }
        }
        let slowest_operation = spans.slowest().and_then(|span| {
            Some(SlowestOperation {
                name: span.name().to_string(),
                category: span.category(),
                duration: span.duration()?,
            })
        });

        Self {
            request_id: context.id().to_string(),
            method: context.method().to_string(),
            path: context.path().to_string(),
            status,
            started_at: context.started_at(),
            duration: end.saturating_duration_since(context.start()),
            response_size: context.response_size(),
            total_events: context.events().len(),
            severity_counts,
            category_counts,
            errors,
            warnings,
            slowest_operation,
            span_count: spans.len(),
            category_timings,
            metadata: context.metadata().clone(),
        }
    }

    /// Returns true for a status of 400 or above.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Returns the number of events of a severity.
    #[must_use]
    pub fn severity_count(&self, severity: Severity) -> usize {
        self.severity_counts.get(&severity).copied().unwrap_or(0)
    }

    /// Returns the number of events of a category.
    #[must_use]
    pub fn category_count(&self, category: Category) -> usize {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }
}
