//! The lifecycle event vocabulary.
//!
//! Frameworks report what they are doing as named events with positional
//! arguments, e.g. `("db:query", [request_id, sql, params])`.
//! [`LifecycleEvent::from_named`] checks and destructures such a tuple into a
//! typed event; [`LifecycleEvent::name`] goes the other way.
//!
//! Optional trailing arguments may be omitted or `null`. Extra arguments,
//! missing required ones, and wrongly typed ones are rejected.

use lookout_foundation::{Error, Result};
use serde_json::Value;

/// A typed lifecycle event.
#[derive(Clone, Debug, PartialEq)]
pub enum LifecycleEvent {
    /// `request:start (request_id, method, path)`
    RequestStart {
        /// Request id.
        request_id: String,
        /// HTTP method.
        method: String,
        /// Request path.
        path: String,
    },
    /// `request:end (request_id, status, response_size?)`
    RequestEnd {
        /// Request id.
        request_id: String,
        /// Response status.
        status: u16,
        /// Response size in bytes.
        response_size: Option<u64>,
    },
    /// `request:error (request_id, message)`
    RequestError {
        /// Request id.
        request_id: String,
        /// Error message.
        message: String,
    },
    /// `middleware:enter (request_id, name)`
    MiddlewareEnter {
        /// Request id.
        request_id: String,
        /// Middleware name.
        name: String,
    },
    /// `middleware:exit (request_id, name)`
    MiddlewareExit {
        /// Request id.
        request_id: String,
        /// Middleware name.
        name: String,
    },
    /// `middleware:error (request_id, name, message)`
    MiddlewareError {
        /// Request id.
        request_id: String,
        /// Middleware name.
        name: String,
        /// Error message.
        message: String,
    },
    /// `route:match (request_id, pattern, handler?)`
    RouteMatch {
        /// Request id.
        request_id: String,
        /// Matched route pattern.
        pattern: String,
        /// Handler name.
        handler: Option<String>,
    },
    /// `route:miss (request_id, path)`
    RouteMiss {
        /// Request id.
        request_id: String,
        /// Unmatched path.
        path: String,
    },
    /// `controller:enter (request_id, controller, action)`
    ControllerEnter {
        /// Request id.
        request_id: String,
        /// Controller name.
        controller: String,
        /// Action name.
        action: String,
    },
    /// `controller:exit (request_id, controller, action)`
    ControllerExit {
        /// Request id.
        request_id: String,
        /// Controller name.
        controller: String,
        /// Action name.
        action: String,
    },
    /// `db:query (request_id?, sql, params?)`
    DbQuery {
        /// Request id, if the query runs inside a request.
        request_id: Option<String>,
        /// Query text.
        sql: String,
        /// Bound parameters.
        params: Option<Value>,
    },
    /// `db:result (request_id?, rows?)`
    DbResult {
        /// Request id.
        request_id: Option<String>,
        /// Rows returned or affected.
        rows: Option<u64>,
    },
    /// `db:error (request_id?, message)`
    DbError {
        /// Request id.
        request_id: Option<String>,
        /// Error message.
        message: String,
    },
    /// `auth:check (request_id, strategy)`
    AuthCheck {
        /// Request id.
        request_id: String,
        /// Auth strategy name.
        strategy: String,
    },
    /// `auth:success (request_id, user)`
    AuthSuccess {
        /// Request id.
        request_id: String,
        /// Authenticated user.
        user: String,
    },
    /// `auth:failure (request_id, reason)`
    AuthFailure {
        /// Request id.
        request_id: String,
        /// Failure reason.
        reason: String,
    },
    /// `cache:get (request_id?, key)`
    CacheGet {
        /// Request id.
        request_id: Option<String>,
        /// Cache key.
        key: String,
    },
    /// `cache:set (request_id?, key, ttl_secs?)`
    CacheSet {
        /// Request id.
        request_id: Option<String>,
        /// Cache key.
        key: String,
        /// Time to live in seconds.
        ttl_secs: Option<u64>,
    },
    /// `cache:hit (request_id?, key)`
    CacheHit {
        /// Request id.
        request_id: Option<String>,
        /// Cache key.
        key: String,
    },
    /// `cache:miss (request_id?, key)`
    CacheMiss {
        /// Request id.
        request_id: Option<String>,
        /// Cache key.
        key: String,
    },
    /// `view:render (request_id, template, duration_ms?)`
    ViewRender {
        /// Request id.
        request_id: String,
        /// Template name.
        template: String,
        /// Render time in milliseconds.
        duration_ms: Option<u64>,
    },
    /// `job:start (job_id, name)`
    JobStart {
        /// Job id.
        job_id: String,
        /// Job name.
        name: String,
    },
    /// `job:end (job_id)`
    JobEnd {
        /// Job id.
        job_id: String,
    },
    /// `job:error (job_id, message)`
    JobError {
        /// Job id.
        job_id: String,
        /// Error message.
        message: String,
    },
    /// `search:query (request_id?, query, hits?)`
    SearchQuery {
        /// Request id.
        request_id: Option<String>,
        /// Query text.
        query: String,
        /// Number of hits.
        hits: Option<u64>,
    },
    /// `plugin:load (name, version?)`
    PluginLoad {
        /// Plugin name.
        name: String,
        /// Plugin version.
        version: Option<String>,
    },
    /// `plugin:event (name, event, payload?)`
    PluginEvent {
        /// Plugin name.
        name: String,
        /// Plugin-defined event name.
        event: String,
        /// Event payload.
        payload: Option<Value>,
    },
    /// `api:request (request_id?, method, url)`
    ApiRequest {
        /// Request id.
        request_id: Option<String>,
        /// HTTP method of the outgoing call.
        method: String,
        /// Target URL.
        url: String,
    },
    /// `api:response (request_id?, status)`
    ApiResponse {
        /// Request id.
        request_id: Option<String>,
        /// Response status.
        status: u16,
    },
    /// `security:check (request_id?, check, passed)`
    SecurityCheck {
        /// Request id.
        request_id: Option<String>,
        /// Check name.
        check: String,
        /// Whether the check passed.
        passed: bool,
    },
}

impl LifecycleEvent {
    /// Every lifecycle event name.
    pub const NAMES: [&'static str; 30] = [
        "request:start",
        "request:end",
        "request:error",
        "middleware:enter",
        "middleware:exit",
        "middleware:error",
        "route:match",
        "route:miss",
        "controller:enter",
        "controller:exit",
        "db:query",
        "db:result",
        "db:error",
        "auth:check",
        "auth:success",
        "auth:failure",
        "cache:get",
        "cache:set",
        "cache:hit",
        "cache:miss",
        "view:render",
        "job:start",
        "job:end",
        "job:error",
        "search:query",
        "plugin:load",
        "plugin:event",
        "api:request",
        "api:response",
        "security:check",
    ];

    /// Returns the colon-separated event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RequestStart { .. } => "request:start",
            Self::RequestEnd { .. } => "request:end",
            Self::RequestError { .. } => "request:error",
            Self::MiddlewareEnter { .. } => "middleware:enter",
            Self::MiddlewareExit { .. } => "middleware:exit",
            Self::MiddlewareError { .. } => "middleware:error",
            Self::RouteMatch { .. } => "route:match",
            Self::RouteMiss { .. } => "route:miss",
            Self::ControllerEnter { .. } => "controller:enter",
            Self::ControllerExit { .. } => "controller:exit",
            Self::DbQuery { .. } => "db:query",
            Self::DbResult { .. } => "db:result",
            Self::DbError { .. } => "db:error",
            Self::AuthCheck { .. } => "auth:check",
            Self::AuthSuccess { .. } => "auth:success",
            Self::AuthFailure { .. } => "auth:failure",
            Self::CacheGet { .. } => "cache:get",
            Self::CacheSet { .. } => "cache:set",
            Self::CacheHit { .. } => "cache:hit",
            Self::CacheMiss { .. } => "cache:miss",
            Self::ViewRender { .. } => "view:render",
            Self::JobStart { .. } => "job:start",
            Self::JobEnd { .. } => "job:end",
            Self::JobError { .. } => "job:error",
            Self::SearchQuery { .. } => "search:query",
            Self::PluginLoad { .. } => "plugin:load",
            Self::PluginEvent { .. } => "plugin:event",
            Self::ApiRequest { .. } => "api:request",
            Self::ApiResponse { .. } => "api:response",
            Self::SecurityCheck { .. } => "security:check",
        }
    }

    /// Returns the request the event belongs to, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::RequestStart { request_id, .. }
            | Self::RequestEnd { request_id, .. }
            | Self::RequestError { request_id, .. }
            | Self::MiddlewareEnter { request_id, .. }
            | Self::MiddlewareExit { request_id, .. }
            | Self::MiddlewareError { request_id, .. }
            | Self::RouteMatch { request_id, .. }
            | Self::RouteMiss { request_id, .. }
            | Self::ControllerEnter { request_id, .. }
            | Self::ControllerExit { request_id, .. }
            | Self::AuthCheck { request_id, .. }
            | Self::AuthSuccess { request_id, .. }
            | Self::AuthFailure { request_id, .. }
            | Self::ViewRender { request_id, .. } => Some(request_id),
            Self::DbQuery { request_id, .. }
            | Self::DbResult { request_id, .. }
            | Self::DbError { request_id, .. }
            | Self::CacheGet { request_id, .. }
            | Self::CacheSet { request_id, .. }
            | Self::CacheHit { request_id, .. }
            | Self::CacheMiss { request_id, .. }
            | Self::SearchQuery { request_id, .. }
            | Self::ApiRequest { request_id, .. }
            | Self::ApiResponse { request_id, .. }
            | Self::SecurityCheck { request_id, .. } => request_id.as_deref(),
            Self::JobStart { .. }
            | Self::JobEnd { .. }
            | Self::JobError { .. }
            | Self::PluginLoad { .. }
            | Self::PluginEvent { .. } => None,
        }
    }

    /// Destructures a named event with positional arguments.
    ///
    /// # Errors
    ///
    /// Returns a malformed-event error for an unknown name, a missing or
    /// wrongly typed argument, or too many arguments.
    pub fn from_named(name: &str, args: &[Value]) -> Result<Self> {
        let a = Args { name, values: args };
        let event = match name {
            "request:start" => {
                a.arity(3)?;
                Self::RequestStart {
                    request_id: a.string(0, "request_id")?,
                    method: a.string(1, "method")?,
                    path: a.string(2, "path")?,
                }
            }
            "request:end" => {
                a.arity(3)?;
                Self::RequestEnd {
                    request_id: a.string(0, "request_id")?,
                    status: a.status(1)?,
                    response_size: a.opt_u64(2, "response_size")?,
                }
            }
            "request:error" => {
                a.arity(2)?;
                Self::RequestError {
                    request_id: a.string(0, "request_id")?,
                    message: a.string(1, "message")?,
                }
            }
            "middleware:enter" | "middleware:exit" => {
                a.arity(2)?;
                let request_id = a.string(0, "request_id")?;
                let name = a.string(1, "name")?;
                if a.name == "middleware:enter" {
                    Self::MiddlewareEnter { request_id, name }
                } else {
                    Self::MiddlewareExit { request_id, name }
                }
            }
            "middleware:error" => {
                a.arity(3)?;
                Self::MiddlewareError {
                    request_id: a.string(0, "request_id")?,
                    name: a.string(1, "name")?,
                    message: a.string(2, "message")?,
                }
            }
            "route:match" => {
                a.arity(3)?;
                Self::RouteMatch {
                    request_id: a.string(0, "request_id")?,
                    pattern: a.string(1, "pattern")?,
                    handler: a.opt_string(2, "handler")?,
                }
            }
            "route:miss" => {
                a.arity(2)?;
                Self::RouteMiss {
                    request_id: a.string(0, "request_id")?,
                    path: a.string(1, "path")?,
                }
            }
            "controller:enter" | "controller:exit" => {
                a.arity(3)?;
                let request_id = a.string(0, "request_id")?;
                let controller = a.string(1, "controller")?;
                let action = a.string(2, "action")?;
                if a.name == "controller:enter" {
                    Self::ControllerEnter { request_id, controller, action }
                } else {
                    Self::ControllerExit { request_id, controller, action }
                }
            }
            "db:query" => {
                a.arity(3)?;
                Self::DbQuery {
                    request_id: a.opt_string(0, "request_id")?,
                    sql: a.string(1, "sql")?,
                    params: a.opt_value(2),
                }
            }
            "db:result" => {
                a.arity(2)?;
                Self::DbResult {
                    request_id: a.opt_string(0, "request_id")?,
                    rows: a.opt_u64(1, "rows")?,
                }
            }
            "db:error" => {
                a.arity(2)?;
                Self::DbError {
                    request_id: a.opt_string(0, "request_id")?,
                    message: a.string(1, "message")?,
                }
            }
            "auth:check" => {
                a.arity(2)?;
                Self::AuthCheck {
                    request_id: a.string(0, "request_id")?,
                    strategy: a.string(1, "strategy")?,
                }
            }
            "auth:success" => {
                a.arity(2)?;
                Self::AuthSuccess {
                    request_id: a.string(0, "request_id")?,
                    user: a.string(1, "user")?,
                }
            }
            "auth:failure" => {
                a.arity(2)?;
                Self::AuthFailure {
                    request_id: a.string(0, "request_id")?,
                    reason: a.string(1, "reason")?,
                }
            }
            "cache:get" | "cache:hit" | "cache:miss" => {
                a.arity(2)?;
                let request_id = a.opt_string(0, "request_id")?;
                let key = a.string(1, "key")?;
                match a.name {
                    "cache:get" => Self::CacheGet { request_id, key },
                    "cache:hit" => Self::CacheHit { request_id, key },
                    _ => Self::CacheMiss { request_id, key },
                }
            }
            "cache:set" => {
                a.arity(3)?;
                Self::CacheSet {
                    request_id: a.opt_string(0, "request_id")?,
                    key: a.string(1, "key")?,
                    ttl_secs: a.opt_u64(2, "ttl_secs")?,
                }
            }
            "view:render" => {
                a.arity(3)?;
                Self::ViewRender {
                    request_id: a.string(0, "request_id")?,
                    template: a.string(1, "template")?,
                    duration_ms: a.opt_u64(2, "duration_ms")?,
                }
            }
            "job:start" => {
                a.arity(2)?;
                Self::JobStart {
                    job_id: a.string(0, "job_id")?,
                    name: a.string(1, "name")?,
                }
            }
            "job:end" => {
                a.arity(1)?;
                Self::JobEnd {
                    job_id: a.string(0, "job_id")?,
                }
            }
            "job:error" => {
                a.arity(2)?;
                Self::JobError {
                    job_id: a.string(0, "job_id")?,
                    message: a.string(1, "message")?,
                }
            }
            "search:query" => {
                a.arity(3)?;
                Self::SearchQuery {
                    request_id: a.opt_string(0, "request_id")?,
                    query: a.string(1, "query")?,
                    hits: a.opt_u64(2, "hits")?,
                }
            }
            "plugin:load" => {
                a.arity(2)?;
                Self::PluginLoad {
                    name: a.string(0, "name")?,
                    version: a.opt_string(1, "version")?,
                }
            }
            "plugin:event" => {
                a.arity(3)?;
                Self::PluginEvent {
                    name: a.string(0, "name")?,
                    event: a.string(1, "event")?,
                    payload: a.opt_value(2),
                }
            }
            "api:request" => {
                a.arity(3)?;
                Self::ApiRequest {
                    request_id: a.opt_string(0, "request_id")?,
                    method: a.string(1, "method")?,
                    url: a.string(2, "url")?,
                }
            }
            "api:response" => {
                a.arity(2)?;
                Self::ApiResponse {
                    request_id: a.opt_string(0, "request_id")?,
                    status: a.status(1)?,
                }
            }
            "security:check" => {
                a.arity(3)?;
                Self::SecurityCheck {
                    request_id: a.opt_string(0, "request_id")?,
                    check: a.string(1, "check")?,
                    passed: a.bool(2, "passed")?,
                }
            }
            _ => return Err(Error::malformed_event(name, "unknown lifecycle event")),
        };
        Ok(event)
    }
}

// =============================================================================
// Positional Arguments
// =============================================================================

struct Args<'a> {
    name: &'a str,
    values: &'a [Value],
}

impl Args<'_> {
    fn malformed(&self, reason: impl Into<String>) -> Error {
        Error::malformed_event(self.name, reason)
    }

    fn arity(&self, max: usize) -> Result<()> {
        if self.values.len() > max {
            return Err(self.malformed(format!(
                "expected at most {max} arguments, got {}",
                self.values.len()
            )));
        }
        Ok(())
    }

    /// The argument at `index`, treating `null` as absent.
    fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).filter(|v| !v.is_null())
    }

    fn string(&self, index: usize, field: &str) -> Result<String> {
        match self.opt_string(index, field)? {
            Some(s) if !s.is_empty() => Ok(s),
            Some(_) => Err(self.malformed(format!("`{field}` must not be empty"))),
            None => Err(self.malformed(format!("missing `{field}` at position {index}"))),
        }
    }

    fn opt_string(&self, index: usize, field: &str) -> Result<Option<String>> {
        match self.get(index) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            // Numeric ids are common enough to accept.
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(self.malformed(format!("`{field}` must be a string"))),
        }
    }

    fn opt_u64(&self, index: usize, field: &str) -> Result<Option<u64>> {
        match self.get(index) {
            None => Ok(None),
            Some(v) => v
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.malformed(format!("`{field}` must be a non-negative integer"))),
        }
    }

    fn status(&self, index: usize) -> Result<u16> {
        let status = self
            .opt_u64(index, "status")?
            .ok_or_else(|| self.malformed(format!("missing `status` at position {index}")))?;
        u16::try_from(status)
            .ok()
            .filter(|s| (100..=999).contains(s))
            .ok_or_else(|| self.malformed(format!("`status` {status} is not an HTTP status")))
    }

    fn bool(&self, index: usize, field: &str) -> Result<bool> {
        match self.get(index) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(self.malformed(format!("`{field}` must be a boolean"))),
            None => Err(self.malformed(format!("missing `{field}` at position {index}"))),
        }
    }

    fn opt_value(&self, index: usize) -> Option<Value> {
        self.get(index).cloned()
    }
}

// =============================================================================
// Tests
// =============================================================================
