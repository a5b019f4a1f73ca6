//! Severities, categories, level filtering, and errors for Lookout.
//!
//! This crate provides:
//! - [`Severity`] - Totally ordered verbosity rank (`Off` through `Trace`)
//! - [`Category`] - Closed set of subsystem tags
//! - [`LevelFilter`] - Global threshold plus per-category overrides
//! - [`LevelPreset`] - Named filter configurations built from the filter setters
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod category;
pub mod error;
pub mod level;
pub mod severity;

pub use category::Category;
pub use error::{Error, ErrorContext, ErrorKind, Result};
pub use level::{LevelFilter, LevelPreset};
pub use severity::Severity;
