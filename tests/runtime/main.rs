//! Integration tests for Layer 2: Runtime
//!
//! Tests lifecycle dispatch, middleware, and the process-wide debugger.

mod global;
mod middleware;
