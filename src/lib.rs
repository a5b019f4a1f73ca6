//! Lookout - In-process debugging for request-serving applications
//!
//! This crate re-exports all layers of the Lookout system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: lookout_runtime    - Lifecycle hooks, middleware, process-wide debugger
//! Layer 1: lookout_debug      - Recorder, breakpoints, reports
//! Layer 0: lookout_foundation - Core types (Severity, Category, LevelFilter, Error)
//! ```

pub use lookout_debug as debug;
pub use lookout_foundation as foundation;
pub use lookout_runtime as runtime;
