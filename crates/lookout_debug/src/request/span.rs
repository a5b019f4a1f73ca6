//! Timing spans and span trees.
//!
//! Spans of one request are stored in a [`SpanTree`] arena and refer to each
//! other by [`SpanId`]. Children keep insertion order, which is also their
//! sibling order. Walks over the tree use an explicit stack, so arbitrarily
//! deep nesting from caller instrumentation cannot overflow the call stack.

use std::time::{Duration, Instant};

use lookout_foundation::{Category, Error, Result};

// =============================================================================
// Span Id
// =============================================================================

/// Index of a span within its request's [`SpanTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(pub(crate) usize);

impl SpanId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

// =============================================================================
// Timing Span
// =============================================================================

/// A timed, possibly nested unit of work.
#[derive(Clone, Debug, PartialEq)]
pub struct TimingSpan {
    name: String,
    category: Category,
    request_id: Option<String>,
    start: Instant,
    end: Option<Instant>,
    duration: Option<Duration>,
    parent: Option<SpanId>,
    children: Vec<SpanId>,
    force_closed: bool,
}

impl TimingSpan {
    pub(crate) fn new(
        name: String,
        category: Category,
        request_id: Option<String>,
        parent: Option<SpanId>,
        start: Instant,
    ) -> Self {
        Self {
            name,
            category,
            request_id,
            start,
            end: None,
            duration: None,
            parent,
            children: Vec::new(),
            force_closed: false,
        }
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the span category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Returns the owning request, or `None` for a global span.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns when the span started.
    #[must_use]
    pub const fn start(&self) -> Instant {
        self.start
    }

    /// Returns when the span ended, if it has.
    #[must_use]
    pub const fn end(&self) -> Option<Instant> {
        self.end
    }

    /// Returns the span duration, if it has ended.
    #[must_use]
    pub const fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Returns the parent span, or `None` for a root.
    #[must_use]
    pub const fn parent(&self) -> Option<SpanId> {
        self.parent
    }

    /// Returns the child spans in insertion order.
    #[must_use]
    pub fn children(&self) -> &[SpanId] {
        &self.children
    }

    /// Returns true while the span has not ended.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Returns true if the span was closed by `end_request` rather than by its owner.
    #[must_use]
    pub const fn was_force_closed(&self) -> bool {
        self.force_closed
    }

    /// Stamps the end time and returns the duration.
    pub(crate) fn close(&mut self, end: Instant) -> Result<Duration> {
        if self.end.is_some() {
            return Err(Error::span_already_ended(self.name.clone()));
        }
        let duration = end.saturating_duration_since(self.start);
        self.end = Some(end);
        self.duration = Some(duration);
        Ok(duration)
    }

    pub(crate) fn force_close(&mut self, end: Instant) {
        if self.close(end).is_ok() {
            self.force_closed = true;
        }
    }
}

// =============================================================================
// Span Tree
// =============================================================================

/// Arena holding the span forest of one request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpanTree {
    spans: Vec<TimingSpan>,
    roots: Vec<SpanId>,
}

impl SpanTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of spans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Returns true if no span was ever opened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Returns a span by id.
    #[must_use]
    pub fn get(&self, id: SpanId) -> Option<&TimingSpan> {
        self.spans.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: SpanId) -> Option<&mut TimingSpan> {
        self.spans.get_mut(id.0)
    }

    /// Returns the root span ids in insertion order.
    #[must_use]
    pub fn roots(&self) -> &[SpanId] {
        &self.roots
    }

    /// Returns the root spans in insertion order.
    pub fn root_spans(&self) -> impl Iterator<Item = &TimingSpan> {
        self.roots.iter().map(|id| &self.spans[id.0])
    }

    /// Returns the direct children of a span in insertion order.
    pub fn children(&self, id: SpanId) -> impl Iterator<Item = &TimingSpan> {
        self.get(id)
            .map(TimingSpan::children)
            .unwrap_or_default()
            .iter()
            .map(|child| &self.spans[child.0])
    }

    /// Returns every span in the order it was opened.
    pub fn iter(&self) -> impl Iterator<Item = (SpanId, &TimingSpan)> {
        self.spans.iter().enumerate().map(|(i, s)| (SpanId(i), s))
    }

    /// Walks the forest depth-first, pre-order, yielding each span with its depth.
    #[must_use]
    pub fn walk(&self) -> SpanWalk<'_> {
        let stack = self.roots.iter().rev().map(|id| (*id, 0)).collect();
        SpanWalk { tree: self, stack }
    }

    /// Returns the first span opened with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<SpanId> {
        self.spans.iter().position(|s| s.name == name).map(SpanId)
    }

    /// Returns the ended span with the longest duration anywhere in the forest.
    ///
    /// Ties go to the span visited first in a pre-order walk.
    #[must_use]
    pub fn slowest(&self) -> Option<&TimingSpan> {
        let mut slowest: Option<&TimingSpan> = None;
        for (_, span) in self.walk() {
            let Some(duration) = span.duration else {
                continue;
            };
            if slowest.is_none_or(|s| s.duration.is_some_and(|d| duration > d)) {
                slowest = Some(span);
            }
        }
        slowest
    }

    /// Returns the number of spans still open.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.spans.iter().filter(|s| s.is_open()).count()
    }

    /// Opens a span as a child of `parent`, or as a new root.
    pub(crate) fn open(
        &mut self,
        name: String,
        category: Category,
        request_id: Option<String>,
        parent: Option<SpanId>,
        start: Instant,
    ) -> SpanId {
        let id = SpanId(self.spans.len());
        self.spans
            .push(TimingSpan::new(name, category, request_id, parent, start));
        match parent.and_then(|p| self.spans.get_mut(p.0)) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }
        id
    }
}

/// Depth-first iterator over a [`SpanTree`].
#[derive(Debug)]
pub struct SpanWalk<'a> {
    tree: &'a SpanTree,
    stack: Vec<(SpanId, usize)>,
}

impl<'a> Iterator for SpanWalk<'a> {
    type Item = (usize, &'a TimingSpan);

    fn next(&mut self) -> Option<Self::Item> {
        let (id, depth) = self.stack.pop()?;
        let span = &self.tree.spans[id.0];
        self.stack
            .extend(span.children.iter().rev().map(|child| (*child, depth + 1)));
        Some((depth, span))
    }
}

// =============================================================================
// Tests
// =============================================================================
