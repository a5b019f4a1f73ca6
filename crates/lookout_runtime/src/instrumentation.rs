//! Maps lifecycle events onto recorder events and timing spans.
//!
//! Paired events (`middleware:enter`/`middleware:exit`, `controller:enter`/
//! `controller:exit`, `db:query`/`db:result`, `api:request`/`api:response`,
//! `job:start`/`job:end`) open and close spans. Everything else becomes a
//! single event in the matching category.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use lookout_debug::{Debugger, EventBuilder, RequestReport, SpanHandle};
use lookout_foundation::{Category, Result, Severity};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::lifecycle::LifecycleEvent;

/// What kind of paired operation a span tracks.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum SpanKind {
    Middleware(String),
    Controller(String),
    Query,
    Api,
    Job,
}

/// Open spans are keyed by scope (request or job id) and kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SpanKey {
    scope: Option<String>,
    kind: SpanKind,
}

impl SpanKey {
    fn new(scope: Option<&str>, kind: SpanKind) -> Self {
        Self {
            scope: scope.map(str::to_string),
            kind,
        }
    }
}

/// Feeds lifecycle events into a [`Debugger`].
#[derive(Debug)]
pub struct Instrumentation {
    debugger: Debugger,
    open: Mutex<HashMap<SpanKey, Vec<SpanHandle>>>,
}

impl Instrumentation {
    /// Creates instrumentation driving `debugger`.
    #[must_use]
    pub fn new(debugger: Debugger) -> Self {
        Self {
            debugger,
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the driven debugger.
    #[must_use]
    pub const fn debugger(&self) -> &Debugger {
        &self.debugger
    }

    /// Returns the number of paired spans still waiting for their closing event.
    #[must_use]
    pub fn open_spans(&self) -> usize {
        self.open.lock().values().map(Vec::len).sum()
    }

    /// Destructures and dispatches a named event.
    ///
    /// # Errors
    ///
    /// Returns an error if the tuple is malformed or the recorder rejects it.
    pub fn dispatch_named(&self, name: &str, args: &[Value]) -> Result<Option<Arc<RequestReport>>> {
        let event = LifecycleEvent::from_named(name, args)?;
        self.dispatch(&event)
    }

    /// Dispatches a lifecycle event.
    ///
    /// Returns the filed report for `request:end`, `None` otherwise. A closing
    /// event with no matching opener is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if `request:start` names a request already in flight,
    /// or the recorder rejects an id.
    pub fn dispatch(&self, event: &LifecycleEvent) -> Result<Option<Arc<RequestReport>>> {
        trace!(target: "lookout::runtime", event = event.name(), "lifecycle event");
        let recorder = self.debugger.recorder();

        match event {
            LifecycleEvent::RequestStart {
                request_id,
                method,
                path,
            } => {
                recorder.start_request(request_id, method, path)?;
                self.record(
                    EventBuilder::new(Category::Transport, Severity::Info, format!("{method} {path}"))
                        .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::RequestEnd {
                request_id,
                status,
                response_size,
            } => {
                self.drop_scope(request_id);
                let report = self
                    .debugger
                    .finish_request(request_id, *status, *response_size);
                if report.is_none() {
                    debug!(
                        target: "lookout::runtime",
                        request = %request_id,
                        "request:end for a request not in flight"
                    );
                }
                return Ok(report);
            }
            LifecycleEvent::RequestError {
                request_id,
                message,
            } => {
                self.record(
                    EventBuilder::new(Category::Transport, Severity::Error, message.as_str())
                        .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::MiddlewareEnter { request_id, name } => {
                self.open(
                    SpanKey::new(Some(request_id.as_str()), SpanKind::Middleware(name.clone())),
                    name,
                    Category::Middleware,
                    Some(request_id.as_str()),
                )?;
                self.record(
                    EventBuilder::new(Category::Middleware, Severity::Trace, format!("enter {name}"))
                        .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::MiddlewareExit { request_id, name } => {
                let duration = self.close(&SpanKey::new(
                    Some(request_id.as_str()),
                    SpanKind::Middleware(name.clone()),
                ));
                self.record(
                    with_duration(
                        EventBuilder::new(Category::Middleware, Severity::Trace, format!("exit {name}")),
                        duration,
                    )
                    .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::MiddlewareError {
                request_id,
                name,
                message,
            } => {
                let duration = self.close(&SpanKey::new(
                    Some(request_id.as_str()),
                    SpanKind::Middleware(name.clone()),
                ));
                self.record(
                    with_duration(
                        EventBuilder::new(Category::Middleware, Severity::Error, format!("{name}: {message}")),
                        duration,
                    )
                    .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::RouteMatch {
                request_id,
                pattern,
                handler,
            } => {
                let mut builder =
                    EventBuilder::new(Category::Routing, Severity::Debug, format!("matched {pattern}"))
                        .request(request_id.as_str());
                if let Some(handler) = handler {
                    builder = builder.payload(json!({ "pattern": pattern, "handler": handler }));
                }
                self.record(builder)?;
            }
            LifecycleEvent::RouteMiss { request_id, path } => {
                self.record(
                    EventBuilder::new(Category::Routing, Severity::Warn, format!("no route for {path}"))
                        .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::ControllerEnter {
                request_id,
                controller,
                action,
            } => {
                let name = format!("{controller}#{action}");
                self.open(
                    SpanKey::new(Some(request_id.as_str()), SpanKind::Controller(name.clone())),
                    &name,
                    Category::Controller,
                    Some(request_id.as_str()),
                )?;
                self.record(
                    EventBuilder::new(Category::Controller, Severity::Debug, format!("enter {name}"))
                        .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::ControllerExit {
                request_id,
                controller,
                action,
            } => {
                let name = format!("{controller}#{action}");
                let duration = self.close(&SpanKey::new(
                    Some(request_id.as_str()),
                    SpanKind::Controller(name.clone()),
                ));
                self.record(
                    with_duration(
                        EventBuilder::new(Category::Controller, Severity::Debug, format!("exit {name}")),
                        duration,
                    )
                    .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::DbQuery {
                request_id,
                sql,
                params,
            } => {
                let request_id = request_id.as_deref();
                self.open(
                    SpanKey::new(request_id, SpanKind::Query),
                    "db query",
                    Category::Database,
                    request_id,
                )?;
                self.record(
                    EventBuilder::new(Category::Database, Severity::Debug, sql.as_str())
                        .payload(json!({ "sql": sql, "params": params }))
                        .maybe_request(request_id),
                )?;
            }
            LifecycleEvent::DbResult { request_id, rows } => {
                let request_id = request_id.as_deref();
                let duration = self.close(&SpanKey::new(request_id, SpanKind::Query));
                let message = rows.map_or_else(
                    || "query finished".to_string(),
                    |rows| format!("query returned {rows} rows"),
                );
                self.record(
                    with_duration(
                        EventBuilder::new(Category::Database, Severity::Debug, message),
                        duration,
                    )
                    .maybe_request(request_id),
                )?;
            }
            LifecycleEvent::DbError {
                request_id,
                message,
            } => {
                let request_id = request_id.as_deref();
                let duration = self.close(&SpanKey::new(request_id, SpanKind::Query));
                self.record(
                    with_duration(
                        EventBuilder::new(Category::Database, Severity::Error, message.as_str()),
                        duration,
                    )
                    .maybe_request(request_id),
                )?;
            }
            LifecycleEvent::AuthCheck {
                request_id,
                strategy,
            } => {
                self.record(
                    EventBuilder::new(Category::Auth, Severity::Debug, format!("auth check: {strategy}"))
                        .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::AuthSuccess { request_id, user } => {
                self.record(
                    EventBuilder::new(Category::Auth, Severity::Info, format!("authenticated {user}"))
                        .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::AuthFailure { request_id, reason } => {
                self.record(
                    EventBuilder::new(
                        Category::Auth,
                        Severity::Warn,
                        format!("authentication failed: {reason}"),
                    )
                    .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::CacheGet { request_id, key } => {
                self.cache(request_id.as_deref(), Severity::Trace, format!("cache get {key}"), None)?;
            }
            LifecycleEvent::CacheSet {
                request_id,
                key,
                ttl_secs,
            } => {
                let payload = ttl_secs.map(|ttl| json!({ "key": key, "ttl_secs": ttl }));
                self.cache(request_id.as_deref(), Severity::Debug, format!("cache set {key}"), payload)?;
            }
            LifecycleEvent::CacheHit { request_id, key } => {
                self.cache(request_id.as_deref(), Severity::Debug, format!("cache hit {key}"), None)?;
            }
            LifecycleEvent::CacheMiss { request_id, key } => {
                self.cache(request_id.as_deref(), Severity::Debug, format!("cache miss {key}"), None)?;
            }
            LifecycleEvent::ViewRender {
                request_id,
                template,
                duration_ms,
            } => {
                self.record(
                    with_duration(
                        EventBuilder::new(Category::View, Severity::Debug, format!("rendered {template}")),
                        duration_ms.map(Duration::from_millis),
                    )
                    .request(request_id.as_str()),
                )?;
            }
            LifecycleEvent::JobStart { job_id, name } => {
                self.open(SpanKey::new(Some(job_id.as_str()), SpanKind::Job), name, Category::Jobs, None)?;
                self.record(
                    EventBuilder::new(Category::Jobs, Severity::Info, format!("job {name} started"))
                        .payload(json!({ "job_id": job_id })),
                )?;
            }
            LifecycleEvent::JobEnd { job_id } => {
                let duration = self.close(&SpanKey::new(Some(job_id.as_str()), SpanKind::Job));
                self.record(
                    with_duration(
                        EventBuilder::new(Category::Jobs, Severity::Info, format!("job {job_id} finished")),
                        duration,
                    )
                    .payload(json!({ "job_id": job_id })),
                )?;
            }
            LifecycleEvent::JobError { job_id, message } => {
                let duration = self.close(&SpanKey::new(Some(job_id.as_str()), SpanKind::Job));
                self.record(
                    with_duration(
                        EventBuilder::new(Category::Jobs, Severity::Error, format!("job {job_id}: {message}")),
                        duration,
                    )
                    .payload(json!({ "job_id": job_id })),
                )?;
            }
            LifecycleEvent::SearchQuery {
                request_id,
                query,
                hits,
            } => {
                self.record(
                    EventBuilder::new(Category::Search, Severity::Debug, format!("search: {query}"))
                        .payload(json!({ "query": query, "hits": hits }))
                        .maybe_request(request_id.as_deref()),
                )?;
            }
            LifecycleEvent::PluginLoad { name, version } => {
                self.record(
                    EventBuilder::new(Category::Plugin, Severity::Info, format!("loaded plugin {name}"))
                        .payload(json!({ "plugin": name, "version": version })),
                )?;
            }
            LifecycleEvent::PluginEvent {
                name,
                event,
                payload,
            } => {
                let mut builder =
                    EventBuilder::new(Category::Plugin, Severity::Debug, format!("{name}: {event}"));
                if let Some(payload) = payload {
                    builder = builder.payload(payload.clone());
                }
                self.record(builder)?;
            }
            LifecycleEvent::ApiRequest {
                request_id,
                method,
                url,
            } => {
                let request_id = request_id.as_deref();
                let name = format!("{method} {url}");
                self.open(SpanKey::new(request_id, SpanKind::Api), &name, Category::Api, request_id)?;
                self.record(
                    EventBuilder::new(Category::Api, Severity::Debug, name).maybe_request(request_id),
                )?;
            }
            LifecycleEvent::ApiResponse { request_id, status } => {
                let request_id = request_id.as_deref();
                let duration = self.close(&SpanKey::new(request_id, SpanKind::Api));
                let severity = match *status {
                    500.. => Severity::Error,
                    400.. => Severity::Warn,
                    _ => Severity::Info,
                };
                self.record(
                    with_duration(
                        EventBuilder::new(Category::Api, severity, format!("api response {status}")),
                        duration,
                    )
                    .payload(json!({ "status": status }))
                    .maybe_request(request_id),
                )?;
            }
            LifecycleEvent::SecurityCheck {
                request_id,
                check,
                passed,
            } => {
                let (severity, outcome) = if *passed {
                    (Severity::Debug, "passed")
                } else {
                    (Severity::Warn, "failed")
                };
                self.record(
                    EventBuilder::new(
                        Category::Security,
                        severity,
                        format!("security check {check} {outcome}"),
                    )
                    .maybe_request(request_id.as_deref()),
                )?;
            }
        }
        Ok(None)
    }

    fn record(&self, builder: EventBuilder) -> Result<()> {
        self.debugger.recorder().record(builder)?;
        Ok(())
    }

    fn cache(
        &self,
        request_id: Option<&str>,
        severity: Severity,
        message: String,
        payload: Option<Value>,
    ) -> Result<()> {
        let mut builder = EventBuilder::new(Category::Cache, severity, message).maybe_request(request_id);
        if let Some(payload) = payload {
            builder = builder.payload(payload);
        }
        self.record(builder)
    }

    fn open(
        &self,
        key: SpanKey,
        name: &str,
        category: Category,
        request_id: Option<&str>,
    ) -> Result<()> {
        let handle = self
            .debugger
            .recorder()
            .start_timing(name, category, request_id)?;
        self.open.lock().entry(key).or_default().push(handle);
        Ok(())
    }

    /// Closes the newest span under `key`, returning its duration.
    fn close(&self, key: &SpanKey) -> Option<Duration> {
        let handle = {
            let mut open = self.open.lock();
            let handle = open.get_mut(key).and_then(Vec::pop);
            if open.get(key).is_some_and(Vec::is_empty) {
                open.remove(key);
            }
            handle
        };
        let Some(handle) = handle else {
            debug!(target: "lookout::runtime", ?key, "closing event without an opener");
            return None;
        };
        match self.debugger.recorder().end_timing(&handle) {
            Ok(duration) => Some(duration),
            Err(err) => {
                debug!(target: "lookout::runtime", span = handle.name(), %err, "span already closed");
                None
            }
        }
    }

    /// Forgets the paired spans of a request that is ending.
    fn drop_scope(&self, request_id: &str) {
        self.open
            .lock()
            .retain(|key, _| key.scope.as_deref() != Some(request_id));
    }
}

impl Default for Instrumentation {
    fn default() -> Self {
        Self::new(Debugger::default())
    }
}

fn with_duration(builder: EventBuilder, duration: Option<Duration>) -> EventBuilder {
    match duration {
        Some(duration) => builder.duration(duration),
        None => builder,
    }
}

// =============================================================================
// Tests
// =============================================================================
