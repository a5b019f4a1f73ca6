//! Ring buffer for recorded events.
//!
//! Provides a bounded buffer that keeps the most recent events and evicts
//! the oldest on overflow. Capacity errors never occur.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use lookout_foundation::{Category, Severity};

use super::Event;

// =============================================================================
// Event Buffer
// =============================================================================

/// A ring buffer of shared events, oldest first.
#[derive(Clone, Debug)]
pub struct EventBuffer {
    /// The events, oldest first.
    events: VecDeque<Arc<Event>>,
    /// Maximum number of events to store.
    max_size: usize,
    /// Events ever pushed, including evicted ones.
    total_recorded: u64,
    /// Events evicted on overflow.
    evicted: u64,
}

impl EventBuffer {
    /// Creates a new event buffer with the given maximum size.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
            total_recorded: 0,
            evicted: 0,
        }
    }

    /// Pushes an event, evicting the oldest if the buffer is full.
    pub fn push(&mut self, event: Arc<Event>) {
        self.total_recorded += 1;
        self.events.push_back(event);
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        while self.events.len() > self.max_size {
            self.events.pop_front();
            self.evicted += 1;
        }
    }

    /// Returns the maximum size.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// Changes the maximum size, evicting the oldest events if needed.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict_overflow();
    }

    /// Returns the number of events in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clears all events from the buffer.
    pub fn clear(&mut self) {
        self.events.clear();
        // Counters keep running so ids and totals stay monotonic.
    }

    /// Returns an iterator over all events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Event>> {
        self.events.iter()
    }

    /// Returns the most recent N events, oldest first.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<Arc<Event>> {
        let start = self.events.len().saturating_sub(count);
        self.events.iter().skip(start).cloned().collect()
    }

    /// Returns events matching a predicate.
    pub fn filter<F>(&self, predicate: F) -> Vec<Arc<Event>>
    where
        F: Fn(&Event) -> bool,
    {
        self.events.iter().filter(|e| predicate(e)).cloned().collect()
    }

    /// Returns events tied to a request id.
    #[must_use]
    pub fn for_request(&self, request_id: &str) -> Vec<Arc<Event>> {
        self.filter(|e| e.is_for_request(request_id))
    }

    /// Returns events of a category.
    #[must_use]
    pub fn by_category(&self, category: Category) -> Vec<Arc<Event>> {
        self.filter(|e| e.category == category)
    }

    /// Returns events of a severity.
    #[must_use]
    pub fn by_severity(&self, severity: Severity) -> Vec<Arc<Event>> {
        self.filter(|e| e.severity == severity)
    }

    /// Returns the oldest event.
    #[must_use]
    pub fn oldest(&self) -> Option<&Arc<Event>> {
        self.events.front()
    }

    /// Returns the newest event.
    #[must_use]
    pub fn newest(&self) -> Option<&Arc<Event>> {
        self.events.back()
    }

    /// Returns statistics about the buffer.
    #[must_use]
    pub fn stats(&self) -> EventBufferStats {
        let mut per_severity = BTreeMap::new();
        let mut per_category = BTreeMap::new();
        for event in &self.events {
            *per_severity.entry(event.severity).or_insert(0) += 1;
            *per_category.entry(event.category).or_insert(0) += 1;
        }

        EventBufferStats {
            event_count: self.events.len(),
            max_size: self.max_size,
            total_recorded: self.total_recorded,
            evicted: self.evicted,
            per_severity,
            per_category,
        }
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

// =============================================================================
// Buffer Statistics
// =============================================================================

/// Statistics about an event buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventBufferStats {
    /// Number of events currently in the buffer.
    pub event_count: usize,
    /// Maximum buffer size.
    pub max_size: usize,
    /// Events ever recorded.
    pub total_recorded: u64,
    /// Events evicted on overflow.
    pub evicted: u64,
    /// Count of buffered events per severity.
    pub per_severity: BTreeMap<Severity, usize>,
    /// Count of buffered events per category.
    pub per_category: BTreeMap<Category, usize>,
}

// =============================================================================
// Tests
// =============================================================================
