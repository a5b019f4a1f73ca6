//! The event recorder.
//!
//! [`Recorder`] is the object every collaborator talks to. It gates events
//! through a [`LevelFilter`], appends them to the global ring buffer and to
//! the owning request, fans them out to listeners, and finally hands them to
//! an attached [`BreakpointEngine`].
//!
//! # Locking
//!
//! All mutable state sits behind one mutex, held only for the bookkeeping
//! critical section of each call. Listeners and breakpoint checks run after
//! that lock is released, so a listener may call back into the recorder and a
//! pause breakpoint never blocks other requests.
//!
//! Listeners run synchronously on the emitting thread, in registration order.
//! A slow listener delays the caller that emitted the event; long-running work
//! belongs in a callback breakpoint instead.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lookout_foundation::{
    Category, Error, ErrorContext, LevelFilter, LevelPreset, Result, Severity,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::breakpoint::BreakpointEngine;
use crate::config::DebuggerConfig;
use crate::event::{Event, EventBuffer, EventBufferStats, EventBuilder};
use crate::fault::{FaultChannel, FaultSource, HookResult, isolate};
use crate::request::{RequestContext, SpanHandle, SpanId, SpanOwner, TimingSpan};

// =============================================================================
// Listeners
// =============================================================================

/// Identifier returned by [`Recorder::add_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

impl ListenerId {
    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receives every recorded event.
///
/// Errors and panics are isolated per call and reported on the fault channel;
/// the remaining listeners still run.
pub trait EventListener: Send + Sync {
    /// Called once per recorded event.
    ///
    /// # Errors
    ///
    /// Any error is reported as a fault and otherwise ignored.
    fn on_event(&self, event: &Event) -> HookResult;
}

impl<F> EventListener for F
where
    F: Fn(&Event) -> HookResult + Send + Sync,
{
    fn on_event(&self, event: &Event) -> HookResult {
        self(event)
    }
}

struct ListenerEntry {
    id: ListenerId,
    listener: Arc<dyn EventListener>,
}

// =============================================================================
// Internal State
// =============================================================================

/// An in-flight request: its context plus the stack of open spans.
struct InFlight {
    context: RequestContext,
    /// Distinguishes successive requests that reuse the same id.
    generation: u64,
    /// Open spans, outermost first. The last entry is the deepest open span.
    open: Vec<SpanId>,
}

impl InFlight {
    /// Closes every open span at `end`, innermost first. Returns how many were closed.
    fn force_close_open(&mut self, end: Instant) -> usize {
        let request = self.context.id().to_string();
        let mut closed = 0;
        while let Some(id) = self.open.pop() {
            let Some(span) = self.context.spans_mut().get_mut(id) else {
                continue;
            };
            if span.is_open() {
                warn!(
                    target: "lookout::recorder",
                    request = %request,
                    span = span.name(),
                    "span still open at end of request, force-closing"
                );
                span.force_close(end);
                closed += 1;
            }
        }
        closed
    }
}

struct RecorderState {
    next_event_id: u64,
    next_generation: u64,
    next_global_span: u64,
    buffer: EventBuffer,
    requests: HashMap<String, InFlight>,
    global_open: HashMap<u64, TimingSpan>,
    global_completed: VecDeque<TimingSpan>,
    global_history: usize,
    orphaned_events: u64,
    force_closed_spans: u64,
}

// =============================================================================
// Recorder Statistics
// =============================================================================

/// Counters describing recorder activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecorderStats {
    /// Events that passed the level filter.
    pub events_recorded: u64,
    /// Events rejected by the level filter or the master switch.
    pub events_filtered: u64,
    /// Recorded events whose request id was unknown or already ended.
    pub orphaned_events: u64,
    /// Requests currently in flight.
    pub active_requests: usize,
    /// Global spans currently open.
    pub open_global_spans: usize,
    /// Spans closed by `end_request` instead of by their owner.
    pub force_closed_spans: u64,
    /// Registered listeners.
    pub listener_count: usize,
}

// =============================================================================
// Recorder
// =============================================================================

/// Level-gated event recorder with per-request timing trees.
pub struct Recorder {
    enabled: AtomicBool,
    levels: RwLock<LevelFilter>,
    state: Mutex<RecorderState>,
    listeners: RwLock<Vec<ListenerEntry>>,
    next_listener: AtomicU64,
    breakpoints: RwLock<Option<Arc<BreakpointEngine>>>,
    faults: FaultChannel,
    filtered: AtomicU64,
}

impl Recorder {
    /// Creates a recorder with its own fault channel.
    #[must_use]
    pub fn new(config: &DebuggerConfig) -> Self {
        Self::with_faults(config, FaultChannel::new(config.fault_capacity))
    }

    /// Creates a recorder reporting into an existing fault channel.
    #[must_use]
    pub fn with_faults(config: &DebuggerConfig, faults: FaultChannel) -> Self {
        Self {
            enabled: AtomicBool::new(config.enabled),
            levels: RwLock::new(LevelFilter::from(config.levels)),
            state: Mutex::new(RecorderState {
                next_event_id: 0,
                next_generation: 0,
                next_global_span: 0,
                buffer: EventBuffer::new(config.event_buffer_size),
                requests: HashMap::new(),
                global_open: HashMap::new(),
                global_completed: VecDeque::new(),
                global_history: config.global_span_history,
                orphaned_events: 0,
                force_closed_spans: 0,
            }),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            breakpoints: RwLock::new(None),
            faults,
            filtered: AtomicU64::new(0),
        }
    }

    /// Returns the fault channel listener failures are reported to.
    #[must_use]
    pub fn faults(&self) -> &FaultChannel {
        &self.faults
    }

    // -------------------------------------------------------------------------
    // Master switch and levels
    // -------------------------------------------------------------------------

    /// Returns whether recording is enabled.
    #[must_use]
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enables recording.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Disables recording. Request and span tracking keep working.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Returns a snapshot of the level filter.
    #[must_use]
    pub fn level_filter(&self) -> LevelFilter {
        self.levels.read().clone()
    }

    /// Sets the global threshold.
    pub fn set_level(&self, severity: Severity) {
        self.levels.write().set_global(severity);
    }

    /// Overrides the threshold for one category.
    pub fn set_category_level(&self, category: Category, severity: Severity) {
        self.levels.write().set_category(category, severity);
    }

    /// Removes a category override.
    pub fn clear_category_level(&self, category: Category) {
        self.levels.write().clear_category(category);
    }

    /// Applies a level preset.
    pub fn apply_preset(&self, preset: LevelPreset) {
        self.levels.write().apply(preset);
    }

    /// Returns true if an event of this category and severity would be recorded.
    #[must_use]
    pub fn is_level_enabled(&self, category: Category, severity: Severity) -> bool {
        self.is_enabled() && self.levels.read().enabled(category, severity)
    }

    // -------------------------------------------------------------------------
    // Emission
    // -------------------------------------------------------------------------

    /// Records an event that is not tied to a request.
    pub fn emit(&self, category: Category, severity: Severity, message: impl Into<String>) {
        self.record_validated(EventBuilder::new(category, severity, message));
    }

    /// Records an event with an optional payload and request id.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if `request_id` is empty.
    pub fn emit_with(
        &self,
        category: Category,
        severity: Severity,
        message: impl Into<String>,
        payload: Option<Value>,
        request_id: Option<&str>,
    ) -> Result<()> {
        let mut builder = EventBuilder::new(category, severity, message).maybe_request(request_id);
        builder.payload = payload;
        self.record(builder).map(|_| ())
    }

    /// Records an event and returns it, or `None` if it was filtered out.
    ///
    /// On success the event is appended to the global ring buffer and, if its
    /// request is in flight, to that request. Then every listener runs and the
    /// attached breakpoint engine (if any) checks it. Events for unknown or
    /// already-ended requests stay in the ring buffer but are never attached to
    /// a context.
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if the request id is empty. Nothing is
    /// recorded in that case.
    pub fn record(&self, builder: EventBuilder) -> Result<Option<Arc<Event>>> {
        if let Some(id) = builder.request_id.as_deref() {
            validate_request_id(id, "record")?;
        }
        Ok(self.record_validated(builder))
    }

    /// Records an event whose request id, if any, is known to be non-empty.
    fn record_validated(&self, builder: EventBuilder) -> Option<Arc<Event>> {
        if !self.is_level_enabled(builder.category, builder.severity) {
            self.filtered.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let event = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let id = state.next_event_id;
            state.next_event_id += 1;

            let event = Arc::new(builder.build(id, Instant::now()));
            state.buffer.push(Arc::clone(&event));

            if let Some(request_id) = event.request_id.as_deref() {
                match state.requests.get_mut(request_id) {
                    Some(flight) => flight.context.push_event(Arc::clone(&event)),
                    None => {
                        state.orphaned_events += 1;
                        trace!(
                            target: "lookout::recorder",
                            request = request_id,
                            event = id,
                            "event for unknown or ended request kept unassociated"
                        );
                    }
                }
            }
            event
        };

        self.notify(&event);

        let engine = self.breakpoints.read().clone();
        if let Some(engine) = engine {
            engine.check(&event);
        }

        Some(event)
    }

    fn notify(&self, event: &Event) {
        let listeners: Vec<(ListenerId, Arc<dyn EventListener>)> = {
            let guard = self.listeners.read();
            if guard.is_empty() {
                return;
            }
            guard
                .iter()
                .map(|entry| (entry.id, Arc::clone(&entry.listener)))
                .collect()
        };

        for (id, listener) in listeners {
            if let Err(fault) = isolate(|| listener.on_event(event))
                .into_fault(FaultSource::Listener(id), Some(event.id))
            {
                self.faults.report(fault);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Registers a listener. Listeners run in registration order.
    pub fn add_listener(&self, listener: impl EventListener + 'static) -> ListenerId {
        self.add_shared_listener(Arc::new(listener))
    }

    /// Registers a shared listener.
    pub fn add_shared_listener(&self, listener: Arc<dyn EventListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push(ListenerEntry { id, listener });
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }

    /// Removes every listener.
    pub fn clear_listeners(&self) {
        self.listeners.write().clear();
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    // -------------------------------------------------------------------------
    // Breakpoints
    // -------------------------------------------------------------------------

    /// Routes every recorded event through a breakpoint engine.
    pub fn attach_breakpoints(&self, engine: Arc<BreakpointEngine>) {
        *self.breakpoints.write() = Some(engine);
    }

    /// Stops routing events to the breakpoint engine, returning it.
    pub fn detach_breakpoints(&self) -> Option<Arc<BreakpointEngine>> {
        self.breakpoints.write().take()
    }

    // -------------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------------

    /// Starts tracking a request and returns a snapshot of its fresh context.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is empty or already in flight. The existing
    /// context is never overwritten.
    pub fn start_request(
        &self,
        id: &str,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<RequestContext> {
        validate_request_id(id, "start_request")?;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.requests.contains_key(id) {
            warn!(target: "lookout::recorder", request = id, "duplicate start_request");
            return Err(Error::duplicate_request(id).with_context(
                ErrorContext::new()
                    .with_operation("start_request")
                    .with_request(id),
            ));
        }

        let generation = state.next_generation;
        state.next_generation += 1;
        let context = RequestContext::new(id.to_string(), method.into(), path.into(), Instant::now());
        let snapshot = context.clone();
        state.requests.insert(
            id.to_string(),
            InFlight {
                context,
                generation,
                open: Vec::new(),
            },
        );
        debug!(target: "lookout::recorder", request = id, method = snapshot.method(), path = snapshot.path(), "request started");
        Ok(snapshot)
    }

    /// Finalizes a request and returns its context.
    ///
    /// Any span still open is force-closed with a warning, since that points
    /// at missing `end_timing` calls. Returns `None` if the id was never
    /// started or was already ended; callers treat that as a no-op.
    pub fn end_request(
        &self,
        id: &str,
        status: u16,
        response_size: Option<u64>,
    ) -> Option<RequestContext> {
        let end = Instant::now();
        let mut flight = {
            let mut guard = self.state.lock();
            let Some(mut flight) = guard.requests.remove(id) else {
                debug!(target: "lookout::recorder", request = id, "end_request for unknown or ended request");
                return None;
            };
            let forced = flight.force_close_open(end);
            guard.force_closed_spans += forced as u64;
            flight
        };

        flight.context.finish(end, status, response_size);
        debug!(
            target: "lookout::recorder",
            request = id,
            status,
            events = flight.context.events().len(),
            spans = flight.context.spans().len(),
            "request ended"
        );
        Some(flight.context)
    }

    /// Attaches a metadata entry to an in-flight request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is not in flight.
    pub fn set_metadata(&self, id: &str, key: impl Into<String>, value: Value) -> Result<()> {
        let mut guard = self.state.lock();
        let flight = guard.requests.get_mut(id).ok_or_else(|| {
            Error::unknown_request(id).with_context(
                ErrorContext::new()
                    .with_operation("set_metadata")
                    .with_request(id),
            )
        })?;
        flight.context.insert_metadata(key.into(), value);
        Ok(())
    }

    /// Returns true if the request is in flight.
    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.state.lock().requests.contains_key(id)
    }

    /// Returns the ids of all in-flight requests, sorted.
    #[must_use]
    pub fn active_requests(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.state.lock().requests.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns a copy of an in-flight request's context.
    #[must_use]
    pub fn request_snapshot(&self, id: &str) -> Option<RequestContext> {
        self.state
            .lock()
            .requests
            .get(id)
            .map(|flight| flight.context.clone())
    }

    // -------------------------------------------------------------------------
    // Timing
    // -------------------------------------------------------------------------

    /// Opens a timing span.
    ///
    /// With an in-flight request id the span becomes a child of that request's
    /// deepest open span, or a new root if none is open. Without one (or if the
    /// id is not in flight) it is a process-wide span.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` or `request_id` is empty.
    pub fn start_timing(
        &self,
        name: impl Into<String>,
        category: Category,
        request_id: Option<&str>,
    ) -> Result<SpanHandle> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_argument("name", "span name must not be empty"));
        }
        if let Some(id) = request_id {
            validate_request_id(id, "start_timing")?;
        }

        let start = Instant::now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let Some(id) = request_id {
            if let Some(flight) = state.requests.get_mut(id) {
                let parent = flight.open.last().copied();
                let span = flight.context.spans_mut().open(
                    name.clone(),
                    category,
                    Some(id.to_string()),
                    parent,
                    start,
                );
                flight.open.push(span);
                return Ok(SpanHandle {
                    owner: SpanOwner::Request {
                        request_id: id.to_string(),
                        generation: flight.generation,
                        span,
                    },
                    name,
                });
            }
            debug!(
                target: "lookout::recorder",
                request = id,
                span = %name,
                "timing for unknown request recorded as global span"
            );
        }

        let key = state.next_global_span;
        state.next_global_span += 1;
        state
            .global_open
            .insert(key, TimingSpan::new(name.clone(), category, None, None, start));
        Ok(SpanHandle {
            owner: SpanOwner::Global(key),
            name,
        })
    }

    /// Ends a span and returns its duration.
    ///
    /// Spans may end out of strict LIFO order: an ended span is removed from
    /// its request's open stack wherever it sits, and sibling order in the tree
    /// is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle's request has ended (its spans were
    /// force-closed) or the span was already ended.
    pub fn end_timing(&self, handle: &SpanHandle) -> Result<Duration> {
        let end = Instant::now();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        match &handle.owner {
            SpanOwner::Request {
                request_id,
                generation,
                span,
            } => {
                let flight = state
                    .requests
                    .get_mut(request_id.as_str())
                    .filter(|flight| flight.generation == *generation)
                    .ok_or_else(|| {
                        Error::unknown_span().with_context(
                            ErrorContext::new()
                                .with_operation("end_timing")
                                .with_request(request_id.as_str()),
                        )
                    })?;
                let duration = flight
                    .context
                    .spans_mut()
                    .get_mut(*span)
                    .ok_or_else(Error::unknown_span)?
                    .close(end)?;
                if let Some(pos) = flight.open.iter().rposition(|open| open == span) {
                    flight.open.remove(pos);
                }
                Ok(duration)
            }
            SpanOwner::Global(key) => {
                let mut span = state.global_open.remove(key).ok_or_else(Error::unknown_span)?;
                let duration = span.close(end)?;
                state.global_completed.push_back(span);
                while state.global_completed.len() > state.global_history {
                    state.global_completed.pop_front();
                }
                Ok(duration)
            }
        }
    }

    /// Runs `f` inside a span and returns its result.
    ///
    /// # Errors
    ///
    /// Returns an error if the span could not be opened or closed.
    pub fn timed<T>(
        &self,
        name: impl Into<String>,
        category: Category,
        request_id: Option<&str>,
        f: impl FnOnce() -> T,
    ) -> Result<T> {
        let handle = self.start_timing(name, category, request_id)?;
        let value = f();
        self.end_timing(&handle)?;
        Ok(value)
    }

    /// Returns copies of the global spans still open.
    #[must_use]
    pub fn open_global_spans(&self) -> Vec<TimingSpan> {
        self.state.lock().global_open.values().cloned().collect()
    }

    /// Returns the most recently completed global spans, oldest first.
    #[must_use]
    pub fn completed_global_spans(&self) -> Vec<TimingSpan> {
        self.state.lock().global_completed.iter().cloned().collect()
    }

    // -------------------------------------------------------------------------
    // Event buffer queries
    // -------------------------------------------------------------------------

    /// Returns the most recent N events, oldest first.
    #[must_use]
    pub fn recent_events(&self, count: usize) -> Vec<Arc<Event>> {
        self.state.lock().buffer.recent(count)
    }

    /// Returns buffered events for a request id (in flight or not).
    #[must_use]
    pub fn events_for_request(&self, id: &str) -> Vec<Arc<Event>> {
        self.state.lock().buffer.for_request(id)
    }

    /// Returns buffered events of a category.
    #[must_use]
    pub fn events_by_category(&self, category: Category) -> Vec<Arc<Event>> {
        self.state.lock().buffer.by_category(category)
    }

    /// Returns buffered events of a severity.
    #[must_use]
    pub fn events_by_severity(&self, severity: Severity) -> Vec<Arc<Event>> {
        self.state.lock().buffer.by_severity(severity)
    }

    /// Returns buffered events matching a predicate.
    pub fn filter_events<F>(&self, predicate: F) -> Vec<Arc<Event>>
    where
        F: Fn(&Event) -> bool,
    {
        self.state.lock().buffer.filter(predicate)
    }

    /// Returns the number of buffered events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.state.lock().buffer.len()
    }

    /// Returns buffer statistics.
    #[must_use]
    pub fn buffer_stats(&self) -> EventBufferStats {
        self.state.lock().buffer.stats()
    }

    /// Clears the event ring buffer. In-flight request event lists are kept.
    pub fn clear_events(&self) {
        self.state.lock().buffer.clear();
    }

    /// Resizes the event ring buffer, evicting the oldest events if needed.
    pub fn set_buffer_size(&self, size: usize) {
        self.state.lock().buffer.set_max_size(size);
    }

    /// Returns recorder statistics.
    #[must_use]
    pub fn stats(&self) -> RecorderStats {
        let listener_count = self.listener_count();
        let state = self.state.lock();
        RecorderStats {
            events_recorded: state.next_event_id,
            events_filtered: self.filtered.load(Ordering::Relaxed),
            orphaned_events: state.orphaned_events,
            active_requests: state.requests.len(),
            open_global_spans: state.global_open.len(),
            force_closed_spans: state.force_closed_spans,
            listener_count,
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(&DebuggerConfig::default())
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("enabled", &self.is_enabled())
            .field("levels", &*self.levels.read())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Category convenience emitters
// -----------------------------------------------------------------------------

macro_rules! category_emitters {
    ($($name:ident => $category:ident),* $(,)?) => {
        impl Recorder {
            $(
                #[doc = concat!("Records a `", stringify!($category), "` event not tied to a request.")]
                pub fn $name(&self, severity: Severity, message: impl Into<String>) {
                    self.emit(Category::$category, severity, message);
                }
            )*
        }
    };
}

category_emitters! {
    transport => Transport,
    routing => Routing,
    middleware => Middleware,
    controller => Controller,
    database => Database,
    auth => Auth,
    cache => Cache,
    view => View,
    jobs => Jobs,
    search => Search,
    plugin => Plugin,
    api => Api,
    security => Security,
    general => General,
}

fn validate_request_id(id: &str, operation: &'static str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(
            Error::invalid_argument("request_id", "request id must not be empty")
                .with_context(ErrorContext::new().with_operation(operation)),
        );
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
