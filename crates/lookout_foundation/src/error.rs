//! Error types for the Lookout system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//!
//! Only contract violations by the immediate caller become an [`Error`]:
//! duplicate request ids, malformed arguments, stale span handles. Failures
//! inside collaborator code (listeners, breakpoint predicates) are reported
//! as faults by the debug layer and never surface here.

use std::fmt;

use thiserror::Error;

/// The main error type for Lookout operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a duplicate request id error.
    #[must_use]
    pub fn duplicate_request(id: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateRequest(id.into()))
    }

    /// Creates an unknown request id error.
    #[must_use]
    pub fn unknown_request(id: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownRequest(id.into()))
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument {
            name,
            reason: reason.into(),
        })
    }

    /// Creates an invalid severity error.
    #[must_use]
    pub fn invalid_severity(value: String) -> Self {
        Self::new(ErrorKind::InvalidSeverity(value))
    }

    /// Creates an invalid category error.
    #[must_use]
    pub fn invalid_category(value: String) -> Self {
        Self::new(ErrorKind::InvalidCategory(value))
    }

    /// Creates an unknown span error.
    #[must_use]
    pub fn unknown_span() -> Self {
        Self::new(ErrorKind::UnknownSpan)
    }

    /// Creates a span-already-ended error.
    #[must_use]
    pub fn span_already_ended(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::SpanAlreadyEnded { name: name.into() })
    }

    /// Creates an unknown breakpoint error.
    #[must_use]
    pub fn unknown_breakpoint(id: u64) -> Self {
        Self::new(ErrorKind::UnknownBreakpoint(id))
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPattern(message.into()))
    }

    /// Creates a malformed lifecycle event error.
    #[must_use]
    pub fn malformed_event(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedLifecycleEvent {
            name: name.into(),
            reason: reason.into(),
        })
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// A request id was started while a context with that id is still in flight.
    #[error("duplicate request id: {0}")]
    DuplicateRequest(String),

    /// The request id has no in-flight context.
    #[error("unknown request id: {0}")]
    UnknownRequest(String),

    /// An argument failed validation.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// The argument name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A severity name or ordinal did not parse.
    #[error("invalid severity: {0}")]
    InvalidSeverity(String),

    /// A category name did not parse.
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    /// A span handle does not refer to an open span.
    #[error("unknown span handle")]
    UnknownSpan,

    /// The span was already ended.
    #[error("span already ended: {name}")]
    SpanAlreadyEnded {
        /// The span name.
        name: String,
    },

    /// No breakpoint with this id exists.
    #[error("unknown breakpoint: #{0}")]
    UnknownBreakpoint(u64),

    /// A message pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// A named lifecycle event carried the wrong positional arguments.
    #[error("malformed lifecycle event `{name}`: {reason}")]
    MalformedLifecycleEvent {
        /// The event name.
        name: String,
        /// What was wrong with the arguments.
        reason: String,
    },

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that failed (e.g. `start_request`).
    pub operation: Option<&'static str>,
    /// The request the operation was about, if any.
    pub request_id: Option<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Sets the request id.
    #[must_use]
    pub fn with_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(operation) = self.operation {
            write!(f, "in {operation}")?;
        }
        if let Some(id) = &self.request_id {
            if self.operation.is_some() {
                f.write_str(" ")?;
            }
            write!(f, "for request {id}")?;
        }
        Ok(())
    }
}

/// Result type alias using Lookout's error type.
pub type Result<T> = std::result::Result<T, Error>;
