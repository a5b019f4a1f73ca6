//! Per-request contexts.
//!
//! A [`RequestContext`] is the live record of everything one request emitted:
//! its events in emission order and its span forest. The recorder owns it
//! while the request is in flight and hands it back, finalized, from
//! `end_request`. Callers only ever see it read-only.

pub mod span;

pub use span::{SpanId, SpanTree, SpanWalk, TimingSpan};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use serde_json::Value;

use crate::event::Event;

// =============================================================================
// Request Context
// =============================================================================

/// The record of one logical request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    id: String,
    method: String,
    path: String,
    started_at: SystemTime,
    start: Instant,
    end: Option<Instant>,
    status: Option<u16>,
    response_size: Option<u64>,
    events: Vec<Arc<Event>>,
    spans: SpanTree,
    metadata: BTreeMap<String, Value>,
}

impl RequestContext {
    pub(crate) fn new(id: String, method: String, path: String, start: Instant) -> Self {
        Self {
            id,
            method,
            path,
            started_at: SystemTime::now(),
            start,
            end: None,
            status: None,
            response_size: None,
            events: Vec::new(),
            spans: SpanTree::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Returns the request id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the wall-clock time the request started.
    #[must_use]
    pub const fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Returns the monotonic start time.
    #[must_use]
    pub const fn start(&self) -> Instant {
        self.start
    }

    /// Returns the monotonic end time, once ended.
    #[must_use]
    pub const fn end(&self) -> Option<Instant> {
        self.end
    }

    /// Returns the response status, once ended.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the response size, if reported.
    #[must_use]
    pub const fn response_size(&self) -> Option<u64> {
        self.response_size
    }

    /// Returns the request duration, once ended.
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end.saturating_duration_since(self.start))
    }

    /// Returns true once `end_request` has finalized this context.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.end.is_some()
    }

    /// Returns the events in emission order.
    #[must_use]
    pub fn events(&self) -> &[Arc<Event>] {
        &self.events
    }

    /// Returns the span forest.
    #[must_use]
    pub const fn spans(&self) -> &SpanTree {
        &self.spans
    }

    /// Returns the root spans in insertion order.
    pub fn root_spans(&self) -> impl Iterator<Item = &TimingSpan> {
        self.spans.root_spans()
    }

    /// Returns a span by id.
    #[must_use]
    pub fn span(&self, id: SpanId) -> Option<&TimingSpan> {
        self.spans.get(id)
    }

    /// Returns the metadata map.
    #[must_use]
    pub const fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    pub(crate) fn push_event(&mut self, event: Arc<Event>) {
        self.events.push(event);
    }

    pub(crate) fn spans_mut(&mut self) -> &mut SpanTree {
        &mut self.spans
    }

    pub(crate) fn insert_metadata(&mut self, key: String, value: Value) {
        self.metadata.insert(key, value);
    }

    pub(crate) fn finish(&mut self, end: Instant, status: u16, response_size: Option<u64>) {
        self.end = Some(end);
        self.status = Some(status);
        self.response_size = response_size;
    }
}

// =============================================================================
// Span Handle
// =============================================================================

/// Handle returned by `start_timing`, passed back to `end_timing`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpanHandle {
    pub(crate) owner: SpanOwner,
    pub(crate) name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum SpanOwner {
    /// A span in a request's tree. `generation` distinguishes reuse of the same id.
    Request {
        request_id: String,
        generation: u64,
        span: SpanId,
    },
    /// A process-wide span keyed in the global registry.
    Global(u64),
}

impl SpanHandle {
    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning request id, or `None` for a global span.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match &self.owner {
            SpanOwner::Request { request_id, .. } => Some(request_id),
            SpanOwner::Global(_) => None,
        }
    }

    /// Returns the span's id within its request tree, or `None` for a global span.
    #[must_use]
    pub fn span_id(&self) -> Option<SpanId> {
        match &self.owner {
            SpanOwner::Request { span, .. } => Some(*span),
            SpanOwner::Global(_) => None,
        }
    }

    /// Returns true for a process-wide span.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self.owner, SpanOwner::Global(_))
    }
}
