//! Cross-layer integration tests for Lookout
//!
//! Tests that verify correct interaction between multiple crates.

mod diagnostics;
mod request_flow;
