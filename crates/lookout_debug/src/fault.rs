//! Fault reporting for collaborator code.
//!
//! Listener callbacks, breakpoint conditions, and breakpoint callbacks are
//! written by the application, not by this crate. When one of them returns an
//! error or panics, the failure is turned into a [`Fault`], logged, and pushed
//! onto a single bounded [`FaultChannel`]. It is never re-raised into the
//! emitting call path.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::breakpoint::BreakpointId;
use crate::event::EventId;
use crate::recorder::ListenerId;

// =============================================================================
// Hook Error
// =============================================================================

/// Error returned by application hooks (listeners, conditions, callbacks).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    /// Creates a new hook error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type returned by application hooks.
pub type HookResult<T = ()> = Result<T, HookError>;

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

// =============================================================================
// Fault
// =============================================================================

/// Which piece of application code failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultSource {
    /// An event listener.
    Listener(ListenerId),
    /// A breakpoint condition predicate.
    Condition(BreakpointId),
    /// A breakpoint callback action.
    Callback(BreakpointId),
}

impl fmt::Display for FaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listener(id) => write!(f, "listener {id}"),
            Self::Condition(id) => write!(f, "condition of breakpoint {id}"),
            Self::Callback(id) => write!(f, "callback of breakpoint {id}"),
        }
    }
}

/// A failure isolated from application code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    /// What failed.
    pub source: FaultSource,
    /// The event being processed when it failed.
    pub event_id: Option<EventId>,
    /// Error message, or the panic message.
    pub message: String,
    /// Whether the failure was a panic rather than a returned error.
    pub panicked: bool,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.panicked { "panicked" } else { "failed" };
        write!(f, "{} {kind}: {}", self.source, self.message)?;
        if let Some(id) = self.event_id {
            write!(f, " (event {id})")?;
        }
        Ok(())
    }
}

// =============================================================================
// Fault Channel
// =============================================================================

/// Bounded channel collecting faults from every engine that shares it.
///
/// When the channel is full new faults are logged and dropped.
#[derive(Clone, Debug)]
pub struct FaultChannel {
    tx: Sender<Fault>,
    rx: Receiver<Fault>,
}

impl FaultChannel {
    /// Creates a channel holding at most `capacity` undrained faults.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        Self { tx, rx }
    }

    /// Logs a fault and queues it for consumers.
    pub fn report(&self, fault: Fault) {
        warn!(target: "lookout::fault", source = %fault.source, event = ?fault.event_id, "{}", fault.message);
        match self.tx.try_send(fault) {
            Ok(()) => {}
            Err(TrySendError::Full(fault)) => {
                debug!(target: "lookout::fault", "fault channel full, dropping: {fault}");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Returns a receiver for consuming faults.
    #[must_use]
    pub fn receiver(&self) -> Receiver<Fault> {
        self.rx.clone()
    }

    /// Removes and returns every queued fault.
    #[must_use]
    pub fn drain(&self) -> Vec<Fault> {
        self.rx.try_iter().collect()
    }

    /// Returns the number of queued faults.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns true if no faults are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for FaultChannel {
    fn default() -> Self {
        Self::new(256)
    }
}

// =============================================================================
// Isolation
// =============================================================================

/// Outcome of running application code in isolation.
pub(crate) enum Isolated<T> {
    Ok(T),
    Failed(HookError),
    Panicked(String),
}

impl<T> Isolated<T> {
    /// Converts a failure into a fault; returns the value on success.
    pub(crate) fn into_fault(
        self,
        source: FaultSource,
        event_id: Option<EventId>,
    ) -> Result<T, Fault> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Failed(err) => Err(Fault {
                source,
                event_id,
                message: err.0,
                panicked: false,
            }),
            Self::Panicked(message) => Err(Fault {
                source,
                event_id,
                message,
                panicked: true,
            }),
        }
    }
}

/// Runs a hook, catching both returned errors and panics.
pub(crate) fn isolate<T>(hook: impl FnOnce() -> Result<T, HookError>) -> Isolated<T> {
    match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(Ok(value)) => Isolated::Ok(value),
        Ok(Err(err)) => Isolated::Failed(err),
        Err(payload) => Isolated::Panicked(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
