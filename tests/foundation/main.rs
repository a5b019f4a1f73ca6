//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Severity, Category, LevelFilter, and Error.

mod levels;
