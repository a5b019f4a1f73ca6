//! Lifecycle hooks, request middleware, and the process-wide debugger for Lookout.
//!
//! This crate provides:
//! - [`LifecycleEvent`] - The named lifecycle vocabulary frameworks report in
//! - [`Instrumentation`] - Maps lifecycle events onto events and timing spans
//! - [`instrument_request`] - Middleware that tracks one request per handler call
//! - [`global`] - An install-once process-wide [`Debugger`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod global;
pub mod instrumentation;
pub mod lifecycle;
pub mod middleware;

pub use instrumentation::Instrumentation;
pub use lifecycle::LifecycleEvent;
pub use lookout_debug::Debugger;
pub use middleware::{Exchange, REQUEST_ID_KEY, RequestScope, instrument_request, request_id};
