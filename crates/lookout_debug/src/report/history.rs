//! Capped history of request reports.

use std::collections::VecDeque;
use std::sync::Arc;

use super::RequestReport;

// =============================================================================
// Report History
// =============================================================================

/// FIFO buffer of request reports, oldest evicted first.
#[derive(Clone, Debug)]
pub struct ReportHistory {
    /// The reports in chronological order.
    reports: VecDeque<Arc<RequestReport>>,
    /// Maximum number of reports to retain.
    capacity: usize,
}

impl ReportHistory {
    /// Creates a new history with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            reports: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Returns the capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, evicting the oldest reports if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.reports.len() > self.capacity {
            self.reports.pop_front();
        }
    }

    /// Returns the number of retained reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Returns true if no report is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Appends a report, evicting the oldest if at capacity.
    ///
    /// Returns false if the capacity is zero and nothing was retained.
    pub fn push(&mut self, report: Arc<RequestReport>) -> bool {
        if self.capacity == 0 {
            return false;
        }
        self.reports.push_back(report);
        self.evict_overflow();
        true
    }

    /// Returns the most recent report for a request id.
    #[must_use]
    pub fn get(&self, request_id: &str) -> Option<&Arc<RequestReport>> {
        self.reports.iter().rev().find(|r| r.request_id == request_id)
    }

    /// Returns the most recent report.
    #[must_use]
    pub fn latest(&self) -> Option<&Arc<RequestReport>> {
        self.reports.back()
    }

    /// Returns the oldest report.
    #[must_use]
    pub fn oldest(&self) -> Option<&Arc<RequestReport>> {
        self.reports.front()
    }

    /// Returns an iterator from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RequestReport>> {
        self.reports.iter()
    }

    /// Returns the N most recent reports, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &Arc<RequestReport>> {
        let skip = self.reports.len().saturating_sub(count);
        self.reports.iter().skip(skip)
    }

    /// Removes every report.
    pub fn clear(&mut self) {
        self.reports.clear();
    }

    /// Returns the reports as a vector, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Arc<RequestReport>> {
        self.reports.iter().cloned().collect()
    }
}

impl Default for ReportHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

// =============================================================================
// Tests
// =============================================================================
