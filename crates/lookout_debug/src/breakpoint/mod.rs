//! Conditional breakpoints over recorded events.
//!
//! A breakpoint pairs filters (category and severity allow-lists, a hit cap,
//! an optional predicate) with an action. [`BreakpointEngine::check`] runs
//! every event past the breakpoints in insertion order and dispatches the
//! actions of those that match.
//!
//! Predicates and callbacks are application code. They run without any engine
//! lock held, and their errors and panics become faults instead of reaching
//! the caller of `check`.

pub mod pause;
pub mod presets;

pub use pause::{PauseLatch, PausedAt, ResumeHandle};

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use lookout_foundation::{Category, Error, Result, Severity};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config::DebuggerConfig;
use crate::event::Event;
use crate::fault::{FaultChannel, FaultSource, HookResult, isolate};

// =============================================================================
// Identifiers and hooks
// =============================================================================

/// Identifier returned by [`BreakpointEngine::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BreakpointId(pub(crate) u64);

impl BreakpointId {
    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Predicate deciding whether a filtered event triggers a breakpoint.
pub type Condition = Arc<dyn Fn(&Event) -> HookResult<bool> + Send + Sync>;

/// Function run by a callback breakpoint.
///
/// The handle resumes the engine's pause latch; the engine never resumes on
/// the callback's behalf.
pub type BreakpointCallback = Arc<dyn Fn(&BreakpointHit, ResumeHandle) -> HookResult + Send + Sync>;

// =============================================================================
// Actions
// =============================================================================

/// What a breakpoint does when it triggers.
#[derive(Clone, Default)]
pub enum BreakpointAction {
    /// Log a breakpoint-hit notice.
    #[default]
    Log,
    /// Log, then capture the payload and call context for inspection.
    Inspect,
    /// Log, then block the triggering flow until resumed.
    Pause,
    /// Run an application callback.
    Callback(BreakpointCallback),
}

impl BreakpointAction {
    /// Wraps a function as a callback action.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&BreakpointHit, ResumeHandle) -> HookResult + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// Returns the action's kind.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Log => ActionKind::Log,
            Self::Inspect => ActionKind::Inspect,
            Self::Pause => ActionKind::Pause,
            Self::Callback(_) => ActionKind::Callback,
        }
    }
}

impl fmt::Debug for BreakpointAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().name())
    }
}

/// The kind of a [`BreakpointAction`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// See [`BreakpointAction::Log`].
    Log,
    /// See [`BreakpointAction::Inspect`].
    Inspect,
    /// See [`BreakpointAction::Pause`].
    Pause,
    /// See [`BreakpointAction::Callback`].
    Callback,
}

impl ActionKind {
    /// Returns the lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Inspect => "inspect",
            Self::Pause => "pause",
            Self::Callback => "callback",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Breakpoint Spec
// =============================================================================

/// Definition of a breakpoint, consumed by [`BreakpointEngine::add`].
#[derive(Clone, Debug)]
pub struct BreakpointSpec {
    name: String,
    condition: Option<ConditionSlot>,
    categories: Option<Vec<Category>>,
    severities: Option<Vec<Severity>>,
    max_hits: Option<u64>,
    action: BreakpointAction,
    enabled: bool,
}

impl BreakpointSpec {
    /// Creates an enabled, unconditional log breakpoint.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: None,
            categories: None,
            severities: None,
            max_hits: None,
            action: BreakpointAction::Log,
            enabled: true,
        }
    }

    /// Sets a fallible predicate.
    #[must_use]
    pub fn condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&Event) -> HookResult<bool> + Send + Sync + 'static,
    {
        self.condition = Some(ConditionSlot(Arc::new(condition)));
        self
    }

    /// Sets an infallible predicate.
    #[must_use]
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.condition(move |event| Ok(predicate(event)))
    }

    /// Restricts the breakpoint to these categories.
    #[must_use]
    pub fn categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.categories = Some(categories.into_iter().collect());
        self
    }

    /// Adds one category to the allow-list.
    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.categories.get_or_insert_with(Vec::new).push(category);
        self
    }

    /// Restricts the breakpoint to these severities.
    #[must_use]
    pub fn severities(mut self, severities: impl IntoIterator<Item = Severity>) -> Self {
        self.severities = Some(severities.into_iter().collect());
        self
    }

    /// Adds one severity to the allow-list.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severities.get_or_insert_with(Vec::new).push(severity);
        self
    }

    /// Caps how many times the breakpoint may trigger.
    #[must_use]
    pub fn max_hits(mut self, max_hits: u64) -> Self {
        self.max_hits = Some(max_hits);
        self
    }

    /// Sets the action.
    #[must_use]
    pub fn action(mut self, action: BreakpointAction) -> Self {
        self.action = action;
        self
    }

    /// Sets whether the breakpoint starts enabled.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Clone)]
struct ConditionSlot(Condition);

impl fmt::Debug for ConditionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<condition>")
    }
}

// =============================================================================
// Breakpoint
// =============================================================================

/// A registered breakpoint.
#[derive(Clone, Debug)]
pub struct Breakpoint {
    id: BreakpointId,
    name: String,
    enabled: bool,
    condition: Option<ConditionSlot>,
    categories: Option<Vec<Category>>,
    severities: Option<Vec<Severity>>,
    max_hits: Option<u64>,
    hit_count: u64,
    action: BreakpointAction,
}

impl Breakpoint {
    fn from_spec(id: BreakpointId, spec: BreakpointSpec) -> Self {
        Self {
            id,
            name: spec.name,
            enabled: spec.enabled,
            condition: spec.condition,
            categories: spec.categories,
            severities: spec.severities,
            max_hits: spec.max_hits,
            hit_count: 0,
            action: spec.action,
        }
    }

    /// Returns the id.
    #[must_use]
    pub const fn id(&self) -> BreakpointId {
        self.id
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the breakpoint is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns how many times the breakpoint has triggered.
    #[must_use]
    pub const fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Returns the hit cap, if any.
    #[must_use]
    pub const fn max_hits(&self) -> Option<u64> {
        self.max_hits
    }

    /// Returns the category allow-list, if any.
    #[must_use]
    pub fn categories(&self) -> Option<&[Category]> {
        self.categories.as_deref()
    }

    /// Returns the severity allow-list, if any.
    #[must_use]
    pub fn severities(&self) -> Option<&[Severity]> {
        self.severities.as_deref()
    }

    /// Returns true if a predicate is set.
    #[must_use]
    pub const fn has_condition(&self) -> bool {
        self.condition.is_some()
    }

    /// Returns the action kind.
    #[must_use]
    pub const fn action_kind(&self) -> ActionKind {
        self.action.kind()
    }

    /// Returns true once the hit cap is reached.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max_hits.is_some_and(|max| self.hit_count >= max)
    }

    /// Every check except the predicate. The cap is tested before any increment.
    fn admits(&self, event: &Event) -> bool {
        self.enabled
            && self
                .categories
                .as_ref()
                .is_none_or(|allowed| allowed.contains(&event.category))
            && self
                .severities
                .as_ref()
                .is_none_or(|allowed| allowed.contains(&event.severity))
            && !self.is_exhausted()
    }
}

// =============================================================================
// Hits and inspections
// =============================================================================

/// One triggering of a breakpoint.
#[derive(Clone, Debug)]
pub struct BreakpointHit {
    /// The breakpoint that triggered.
    pub breakpoint_id: BreakpointId,
    /// Its name.
    pub name: String,
    /// Its hit count including this hit.
    pub hit_count: u64,
    /// The triggering event.
    pub event: Arc<Event>,
    /// The action dispatched.
    pub action: ActionKind,
}

impl fmt::Display for BreakpointHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "breakpoint {} '{}' hit #{} on [{}/{}] {}",
            self.breakpoint_id,
            self.name,
            self.hit_count,
            self.event.category,
            self.event.severity,
            self.event.message
        )
    }
}

/// Snapshot captured by an inspect breakpoint.
#[derive(Clone, Debug)]
pub struct Inspection {
    /// The hit being inspected.
    pub hit: BreakpointHit,
    /// The event payload, pretty-printed.
    pub payload: Option<String>,
    /// Captured call stack, when enabled.
    pub call_context: Option<String>,
}

// =============================================================================
// Breakpoint Engine
// =============================================================================

/// Evaluates breakpoints against events and runs their actions.
pub struct BreakpointEngine {
    breakpoints: Mutex<Vec<Breakpoint>>,
    next_id: AtomicU64,
    latch: Arc<PauseLatch>,
    hits: Mutex<VecDeque<BreakpointHit>>,
    hit_log_size: usize,
    last_inspection: Mutex<Option<Inspection>>,
    capture_call_context: bool,
    faults: FaultChannel,
}

impl BreakpointEngine {
    /// Creates an engine with its own fault channel.
    #[must_use]
    pub fn new(config: &DebuggerConfig) -> Self {
        Self::with_faults(config, FaultChannel::new(config.fault_capacity))
    }

    /// Creates an engine reporting into an existing fault channel.
    #[must_use]
    pub fn with_faults(config: &DebuggerConfig, faults: FaultChannel) -> Self {
        Self {
            breakpoints: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            latch: Arc::new(PauseLatch::new()),
            hits: Mutex::new(VecDeque::new()),
            hit_log_size: config.hit_log_size,
            last_inspection: Mutex::new(None),
            capture_call_context: config.capture_call_context,
            faults,
        }
    }

    /// Returns the fault channel predicate and callback failures go to.
    #[must_use]
    pub fn faults(&self) -> &FaultChannel {
        &self.faults
    }

    // -------------------------------------------------------------------------
    // Definitions
    // -------------------------------------------------------------------------

    /// Registers a breakpoint. Breakpoints are checked in the order they were added.
    pub fn add(&self, spec: BreakpointSpec) -> BreakpointId {
        let id = BreakpointId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(target: "lookout::breakpoint", breakpoint = %id, name = %spec.name, action = %spec.action.kind(), "breakpoint added");
        self.breakpoints.lock().push(Breakpoint::from_spec(id, spec));
        id
    }

    /// Removes a breakpoint. Returns false if it did not exist.
    pub fn remove(&self, id: BreakpointId) -> bool {
        let mut breakpoints = self.breakpoints.lock();
        let before = breakpoints.len();
        breakpoints.retain(|bp| bp.id != id);
        breakpoints.len() != before
    }

    fn update<T>(&self, id: BreakpointId, f: impl FnOnce(&mut Breakpoint) -> T) -> Result<T> {
        let mut breakpoints = self.breakpoints.lock();
        breakpoints
            .iter_mut()
            .find(|bp| bp.id == id)
            .map(f)
            .ok_or_else(|| Error::unknown_breakpoint(id.0))
    }

    /// Enables a breakpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the breakpoint does not exist.
    pub fn enable(&self, id: BreakpointId) -> Result<()> {
        self.update(id, |bp| bp.enabled = true)
    }

    /// Disables a breakpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the breakpoint does not exist.
    pub fn disable(&self, id: BreakpointId) -> Result<()> {
        self.update(id, |bp| bp.enabled = false)
    }

    /// Flips a breakpoint's enabled flag and returns the new state.
    ///
    /// # Errors
    ///
    /// Returns an error if the breakpoint does not exist.
    pub fn toggle(&self, id: BreakpointId) -> Result<bool> {
        self.update(id, |bp| {
            bp.enabled = !bp.enabled;
            bp.enabled
        })
    }

    /// Resets a breakpoint's hit counter, re-arming an exhausted cap.
    ///
    /// # Errors
    ///
    /// Returns an error if the breakpoint does not exist.
    pub fn reset_hits(&self, id: BreakpointId) -> Result<()> {
        self.update(id, |bp| bp.hit_count = 0)
    }

    /// Removes every breakpoint.
    pub fn clear(&self) {
        self.breakpoints.lock().clear();
    }

    /// Returns a copy of a breakpoint.
    #[must_use]
    pub fn get(&self, id: BreakpointId) -> Option<Breakpoint> {
        self.breakpoints.lock().iter().find(|bp| bp.id == id).cloned()
    }

    /// Returns copies of every breakpoint in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<Breakpoint> {
        self.breakpoints.lock().clone()
    }

    /// Returns the number of breakpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.breakpoints.lock().len()
    }

    /// Returns true if no breakpoints are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakpoints.lock().is_empty()
    }

    // -------------------------------------------------------------------------
    // Checking
    // -------------------------------------------------------------------------

    /// Runs an event past every breakpoint and dispatches matching actions.
    ///
    /// Breakpoints are visited in insertion order. Returns true if at least one
    /// triggered. A pause action blocks this call until [`resume`](Self::resume);
    /// the flow pauses at most once per call even if several pause breakpoints
    /// match.
    pub fn check(&self, event: &Arc<Event>) -> bool {
        let candidates: Vec<(BreakpointId, Option<Condition>)> = {
            let breakpoints = self.breakpoints.lock();
            breakpoints
                .iter()
                .filter(|bp| bp.admits(event))
                .map(|bp| (bp.id, bp.condition.as_ref().map(|c| Arc::clone(&c.0))))
                .collect()
        };
        if candidates.is_empty() {
            return false;
        }

        let matched: Vec<BreakpointId> = candidates
            .into_iter()
            .filter_map(|(id, condition)| {
                let Some(condition) = condition else {
                    return Some(id);
                };
                let target: &Event = event;
                match isolate(|| condition(target))
                    .into_fault(FaultSource::Condition(id), Some(event.id))
                {
                    Ok(true) => Some(id),
                    Ok(false) => None,
                    Err(fault) => {
                        self.faults.report(fault);
                        None
                    }
                }
            })
            .collect();
        if matched.is_empty() {
            return false;
        }

        let fired: Vec<(BreakpointHit, BreakpointAction)> = {
            let mut breakpoints = self.breakpoints.lock();
            matched
                .into_iter()
                .filter_map(|id| {
                    let bp = breakpoints.iter_mut().find(|bp| bp.id == id)?;
                    // Another flow may have disabled it or used up its cap meanwhile.
                    if !bp.admits(event) {
                        return None;
                    }
                    bp.hit_count += 1;
                    let hit = BreakpointHit {
                        breakpoint_id: bp.id,
                        name: bp.name.clone(),
                        hit_count: bp.hit_count,
                        event: Arc::clone(event),
                        action: bp.action.kind(),
                    };
                    Some((hit, bp.action.clone()))
                })
                .collect()
        };
        if fired.is_empty() {
            return false;
        }

        {
            let mut hits = self.hits.lock();
            for (hit, _) in &fired {
                hits.push_back(hit.clone());
            }
            while hits.len() > self.hit_log_size {
                hits.pop_front();
            }
        }

        let mut paused = false;
        for (hit, action) in fired {
            self.dispatch(hit, &action, &mut paused);
        }
        true
    }

    fn dispatch(&self, hit: BreakpointHit, action: &BreakpointAction, paused: &mut bool) {
        match action {
            BreakpointAction::Log => log_hit(&hit),
            BreakpointAction::Inspect => {
                log_hit(&hit);
                self.inspect(hit);
            }
            BreakpointAction::Pause => {
                log_hit(&hit);
                if !*paused {
                    *paused = true;
                    self.latch.pause(PausedAt {
                        breakpoint_id: hit.breakpoint_id,
                        name: hit.name,
                        event: hit.event,
                    });
                }
            }
            BreakpointAction::Callback(callback) => {
                debug!(target: "lookout::breakpoint", "{hit}");
                let handle = self.resume_handle();
                if let Err(fault) = isolate(|| callback(&hit, handle))
                    .into_fault(FaultSource::Callback(hit.breakpoint_id), Some(hit.event.id))
                {
                    self.faults.report(fault);
                }
            }
        }
    }

    fn inspect(&self, hit: BreakpointHit) {
        let payload = hit
            .event
            .payload
            .as_ref()
            .and_then(|payload| serde_json::to_string_pretty(payload).ok());
        let call_context = self
            .capture_call_context
            .then(|| format!("{:?}", backtrace::Backtrace::new()));

        info!(
            target: "lookout::breakpoint",
            breakpoint = %hit.breakpoint_id,
            request = hit.event.request_id.as_deref().unwrap_or("-"),
            duration = ?hit.event.duration,
            "inspect payload: {}",
            payload.as_deref().unwrap_or("<none>")
        );
        if let Some(stack) = &call_context {
            debug!(target: "lookout::breakpoint", breakpoint = %hit.breakpoint_id, "call context:\n{stack}");
        }

        *self.last_inspection.lock() = Some(Inspection {
            hit,
            payload,
            call_context,
        });
    }

    // -------------------------------------------------------------------------
    // Hit log
    // -------------------------------------------------------------------------

    /// Returns the retained hits, oldest first.
    #[must_use]
    pub fn hits(&self) -> Vec<BreakpointHit> {
        self.hits.lock().iter().cloned().collect()
    }

    /// Clears the hit log. Hit counters are untouched.
    pub fn clear_hits(&self) {
        self.hits.lock().clear();
    }

    /// Returns the most recent inspection.
    #[must_use]
    pub fn last_inspection(&self) -> Option<Inspection> {
        self.last_inspection.lock().clone()
    }

    // -------------------------------------------------------------------------
    // Pause control
    // -------------------------------------------------------------------------

    /// Returns the pause latch.
    #[must_use]
    pub fn latch(&self) -> &Arc<PauseLatch> {
        &self.latch
    }

    /// Returns a handle that resumes this engine's latch.
    #[must_use]
    pub fn resume_handle(&self) -> ResumeHandle {
        ResumeHandle::new(Arc::clone(&self.latch))
    }

    /// Releases paused flows. Returns false if nothing was paused.
    pub fn resume(&self) -> bool {
        self.latch.resume()
    }

    /// Returns true while a flow is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.latch.is_paused()
    }

    /// Returns where the current pause happened.
    #[must_use]
    pub fn paused_at(&self) -> Option<PausedAt> {
        self.latch.paused_at()
    }

    /// Blocks until some flow pauses or `timeout` elapses. Returns whether one did.
    pub fn wait_for_pause(&self, timeout: Duration) -> bool {
        self.latch.wait_until_paused(timeout)
    }
}

impl Default for BreakpointEngine {
    fn default() -> Self {
        Self::new(&DebuggerConfig::default())
    }
}

impl fmt::Debug for BreakpointEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakpointEngine")
            .field("breakpoints", &self.len())
            .field("paused", &self.is_paused())
            .finish_non_exhaustive()
    }
}

fn log_hit(hit: &BreakpointHit) {
    info!(
        target: "lookout::breakpoint",
        breakpoint = %hit.breakpoint_id,
        action = %hit.action,
        event = hit.event.id,
        "{hit}"
    );
}

// =============================================================================
// Tests
// =============================================================================
