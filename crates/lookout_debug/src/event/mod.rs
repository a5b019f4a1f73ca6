//! Recorded events.
//!
//! An [`Event`] is immutable once created. The recorder wraps each one in an
//! `Arc` and shares the same allocation between the global [`EventBuffer`]
//! and the owning request's event list.

pub mod buffer;

pub use buffer::{EventBuffer, EventBufferStats};

use std::time::{Duration, Instant};

use lookout_foundation::{Category, Severity};
use serde_json::Value;

/// Identifier assigned to each recorded event, unique per recorder.
pub type EventId = u64;

// =============================================================================
// Event
// =============================================================================

/// An immutable recorded event.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// Unique id within the recorder, increasing in record order.
    pub id: EventId,
    /// The subsystem that emitted the event.
    pub category: Category,
    /// The event severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Optional structured payload.
    pub payload: Option<Value>,
    /// The request this event belongs to, if any.
    pub request_id: Option<String>,
    /// Duration of the operation the event describes, if measured.
    pub duration: Option<Duration>,
    /// When the event was recorded.
    pub timestamp: Instant,
}

impl Event {
    /// Returns true if this event belongs to the given request.
    #[must_use]
    pub fn is_for_request(&self, request_id: &str) -> bool {
        self.request_id.as_deref() == Some(request_id)
    }

    /// Returns true if this is an error event.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Returns true if this is a warning event.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warn
    }

    /// Looks up a top-level field of an object payload.
    #[must_use]
    pub fn payload_field(&self, key: &str) -> Option<&Value> {
        self.payload.as_ref().and_then(|p| p.get(key))
    }
}

// =============================================================================
// Event Builder
// =============================================================================

/// Everything needed to record an event, before the recorder stamps it.
#[derive(Clone, Debug, PartialEq)]
pub struct EventBuilder {
    /// The subsystem that emitted the event.
    pub category: Category,
    /// The event severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Optional structured payload.
    pub payload: Option<Value>,
    /// The request this event belongs to, if any.
    pub request_id: Option<String>,
    /// Duration of the operation, if measured.
    pub duration: Option<Duration>,
}

impl EventBuilder {
    /// Creates a builder for an event without payload or request.
    #[must_use]
    pub fn new(category: Category, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            category,
            severity,
            message: message.into(),
            payload: None,
            request_id: None,
            duration: None,
        }
    }

    /// Builder method to attach a payload.
    #[must_use]
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Builder method to tie the event to a request.
    #[must_use]
    pub fn request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Builder method to tie the event to an optional request.
    #[must_use]
    pub fn maybe_request(mut self, request_id: Option<&str>) -> Self {
        self.request_id = request_id.map(str::to_string);
        self
    }

    /// Builder method to attach a measured duration.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Stamps the builder into an event.
    pub(crate) fn build(self, id: EventId, timestamp: Instant) -> Event {
        Event {
            id,
            category: self.category,
            severity: self.severity,
            message: self.message,
            payload: self.payload,
            request_id: self.request_id,
            duration: self.duration,
            timestamp,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
