//! Request middleware.
//!
//! [`instrument_request`] wraps a handler: it assigns a fresh request id,
//! stores it in the exchange's locals under [`REQUEST_ID_KEY`], tracks the
//! request for the handler's duration, and files a report when it succeeds.
//!
//! [`RequestScope`] is the lower-level guard the middleware is built on. A
//! scope dropped without being finished ends its request with status 500, so
//! an unwinding handler never leaves a request in flight.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use lookout_debug::{Debugger, EventBuilder, RequestReport};
use lookout_foundation::{Category, Severity};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

/// Key under which the request id is stored in [`Exchange::locals_mut`].
pub const REQUEST_ID_KEY: &str = "lookout.request_id";

/// The request/response pair a framework hands to middleware.
pub trait Exchange {
    /// HTTP method.
    fn method(&self) -> &str;

    /// Request URL or path.
    fn url(&self) -> &str;

    /// Per-request storage shared with downstream handlers.
    fn locals(&self) -> &HashMap<String, Value>;

    /// Mutable per-request storage.
    fn locals_mut(&mut self) -> &mut HashMap<String, Value>;

    /// Response status once the handler has run.
    fn status(&self) -> u16;

    /// Response size in bytes, if known.
    fn response_size(&self) -> Option<u64> {
        None
    }
}

/// Returns the request id the middleware stored on an exchange.
#[must_use]
pub fn request_id<X: Exchange + ?Sized>(exchange: &X) -> Option<&str> {
    exchange.locals().get(REQUEST_ID_KEY).and_then(Value::as_str)
}

// =============================================================================
// Request Scope
// =============================================================================

/// Guard for one tracked request.
#[derive(Debug)]
pub struct RequestScope {
    debugger: Debugger,
    id: String,
    finished: bool,
}

impl RequestScope {
    /// Starts tracking a request under a fresh UUID.
    ///
    /// # Errors
    ///
    /// Returns an error if the recorder refuses the request.
    pub fn begin(debugger: &Debugger, method: &str, path: &str) -> lookout_foundation::Result<Self> {
        Self::begin_with_id(debugger, Uuid::new_v4().to_string(), method, path)
    }

    /// Starts tracking a request under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is empty or already in flight.
    pub fn begin_with_id(
        debugger: &Debugger,
        id: impl Into<String>,
        method: &str,
        path: &str,
    ) -> lookout_foundation::Result<Self> {
        let id = id.into();
        debugger.recorder().start_request(&id, method, path)?;
        Ok(Self {
            debugger: debugger.clone(),
            id,
            finished: false,
        })
    }

    /// Returns the request id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ends the request and files its report.
    pub fn finish(mut self, status: u16, response_size: Option<u64>) -> Option<Arc<RequestReport>> {
        self.finished = true;
        self.debugger.finish_request(&self.id, status, response_size)
    }

    /// Records `message` as an error and ends the request without a report.
    pub fn fail(mut self, status: u16, message: &str) {
        self.finished = true;
        let recorder = self.debugger.recorder();
        let event = EventBuilder::new(Category::Transport, Severity::Error, message).request(self.id.as_str());
        if let Err(err) = recorder.record(event) {
            debug!(target: "lookout::runtime", request = %self.id, %err, "failed to record request error");
        }
        recorder.end_request(&self.id, status, None);
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                target: "lookout::runtime",
                request = %self.id,
                "request scope dropped before finishing; ending with status 500"
            );
            self.debugger.recorder().end_request(&self.id, 500, None);
        }
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Runs `next` as a tracked request.
///
/// On success the report is filed with the exchange's status and size. On
/// error the message is recorded as an error event and the request ends
/// with the exchange's status if it is already an error status, else 500.
/// If the recorder refuses to track the request, `next` still runs.
///
/// # Errors
///
/// Returns whatever `next` returns.
pub fn instrument_request<X, T, E, F>(debugger: &Debugger, exchange: &mut X, next: F) -> Result<T, E>
where
    X: Exchange + ?Sized,
    E: fmt::Display,
    F: FnOnce(&mut X) -> Result<T, E>,
{
    let scope = match RequestScope::begin(debugger, exchange.method(), exchange.url()) {
        Ok(scope) => scope,
        Err(err) => {
            warn!(target: "lookout::runtime", %err, "request not tracked");
            return next(exchange);
        }
    };
    exchange
        .locals_mut()
        .insert(REQUEST_ID_KEY.to_string(), Value::String(scope.id().to_string()));

    match next(exchange) {
        Ok(value) => {
            scope.finish(exchange.status(), exchange.response_size());
            Ok(value)
        }
        Err(err) => {
            let status = exchange.status();
            let status = if status >= 400 { status } else { 500 };
            scope.fail(status, &err.to_string());
            Err(err)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
