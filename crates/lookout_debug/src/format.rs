//! Plain-text formatters for events, span trees, and reports.

use std::fmt::Write;
use std::time::Duration;

use crate::event::Event;
use crate::report::{PerformanceReport, RequestReport};
use crate::request::SpanTree;

// =============================================================================
// Report Formatter Trait
// =============================================================================

/// Trait for rendering debugger output.
pub trait ReportFormatter {
    /// Formats a single event.
    fn format_event(&self, event: &Event) -> String;

    /// Formats a request report.
    fn format_request_report(&self, report: &RequestReport) -> String;

    /// Formats a performance report.
    fn format_performance_report(&self, report: &PerformanceReport) -> String;

    /// Formats a span forest.
    fn format_span_tree(&self, tree: &SpanTree) -> String;

    /// Formats several events, one per line.
    fn format_events(&self, events: &[&Event]) -> String {
        events
            .iter()
            .map(|e| self.format_event(e))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// =============================================================================
// Text Formatter
// =============================================================================

/// Formats output as indented plain text.
#[derive(Clone, Debug, Default)]
pub struct TextFormatter {
    /// Whether to include event ids.
    pub show_ids: bool,
    /// Whether to include compact event payloads.
    pub show_payloads: bool,
}

impl TextFormatter {
    /// Creates a new text formatter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to show event ids.
    #[must_use]
    pub fn with_ids(mut self) -> Self {
        self.show_ids = true;
        self
    }

    /// Builder method to show payloads.
    #[must_use]
    pub fn with_payloads(mut self) -> Self {
        self.show_payloads = true;
        self
    }

    /// Formats a duration with a unit suited to its magnitude.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn format_duration(duration: Duration) -> String {
        let us = duration.as_micros();
        if us >= 1_000_000 {
            format!("{:.3}s", us as f64 / 1_000_000.0)
        } else if us >= 1000 {
            format!("{:.3}ms", us as f64 / 1000.0)
        } else {
            format!("{us}us")
        }
    }
}

impl ReportFormatter for TextFormatter {
    fn format_event(&self, event: &Event) -> String {
        let mut out = String::new();
        if self.show_ids {
            let _ = write!(out, "[{:06}] ", event.id);
        }
        let _ = write!(
            out,
            "{:<5} {:<10} {}",
            event.severity.name().to_uppercase(),
            event.category,
            event.message
        );
        if let Some(request) = &event.request_id {
            let _ = write!(out, " (request {request})");
        }
        if let Some(duration) = event.duration {
            let _ = write!(out, " [{}]", Self::format_duration(duration));
        }
        if self.show_payloads {
            if let Some(payload) = &event.payload {
                let _ = write!(out, " {payload}");
            }
        }
        out
    }

    fn format_request_report(&self, report: &RequestReport) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {} -> {} in {} ({})",
            report.method,
            report.path,
            report.status,
            Self::format_duration(report.duration),
            report.request_id
        );
        if let Some(size) = report.response_size {
            let _ = writeln!(out, "  response size: {size} bytes");
        }

        let _ = write!(out, "  events: {}", report.total_events);
        for (severity, count) in &report.severity_counts {
            let _ = write!(out, " {severity}={count}");
        }
        out.push('\n');

        if !report.category_counts.is_empty() {
            out.push_str("  categories:");
            for (category, count) in &report.category_counts {
                let _ = write!(out, " {category}={count}");
            }
            out.push('\n');
        }

        if let Some(slowest) = &report.slowest_operation {
            let _ = writeln!(
                out,
                "  slowest: {} [{}] {}",
                slowest.name,
                slowest.category,
                Self::format_duration(slowest.duration)
            );
        }
        for (category, timing) in &report.category_timings {
            let _ = writeln!(
                out,
                "  {category}: {} over {} spans",
                Self::format_duration(timing.total),
                timing.calls
            );
        }
        for event in report.errors.iter().chain(&report.warnings) {
            let _ = writeln!(out, "  ! {}", self.format_event(event));
        }
        for (key, value) in &report.metadata {
            let _ = writeln!(out, "  {key} = {value}");
        }
        out
    }

    fn format_performance_report(&self, report: &PerformanceReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "requests: {}", report.total_requests);
        if report.total_requests == 0 {
            return out;
        }
        let _ = writeln!(
            out,
            "duration: avg {} min {} max {}",
            Self::format_duration(report.average_duration),
            Self::format_duration(report.min_duration),
            Self::format_duration(report.max_duration)
        );
        let _ = writeln!(
            out,
            "percentiles: p50 {} p95 {} p99 {}",
            Self::format_duration(report.p50),
            Self::format_duration(report.p95),
            Self::format_duration(report.p99)
        );
        let _ = writeln!(out, "error rate: {:.1}%", report.error_rate * 100.0);

        if !report.slow_requests.is_empty() {
            out.push_str("slow requests:\n");
            for r in &report.slow_requests {
                let _ = writeln!(
                    out,
                    "  {} {} {} ({})",
                    Self::format_duration(r.duration),
                    r.method,
                    r.path,
                    r.request_id
                );
            }
        }
        if !report.error_requests.is_empty() {
            out.push_str("error requests:\n");
            for r in &report.error_requests {
                let _ = writeln!(out, "  {} {} {} ({})", r.status, r.method, r.path, r.request_id);
            }
        }
        if !report.module_breakdown.is_empty() {
            out.push_str("modules:\n");
            for m in &report.module_breakdown {
                let _ = writeln!(
                    out,
                    "  {:<10} {:>10} {:>5.1}% calls {} avg {}",
                    m.category.name(),
                    Self::format_duration(m.total),
                    m.percentage,
                    m.calls,
                    Self::format_duration(m.average)
                );
            }
        }
        out
    }

    fn format_span_tree(&self, tree: &SpanTree) -> String {
        let mut out = String::new();
        for (depth, span) in tree.walk() {
            let duration = span
                .duration()
                .map_or_else(|| "open".to_string(), Self::format_duration);
            let forced = if span.was_force_closed() { " (force-closed)" } else { "" };
            let _ = writeln!(
                out,
                "{:indent$}{} [{}] {duration}{forced}",
                "",
                span.name(),
                span.category(),
                indent = depth * 2
            );
        }
        out
    }
}

// =============================================================================
// Tests
// =============================================================================
