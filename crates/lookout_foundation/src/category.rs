//! Subsystem categories.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tag naming the subsystem an event or span belongs to.
///
/// This is a closed set. Each variant has a stable dense index so that
/// per-category tables can be fixed-size arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Category {
    /// HTTP transport: request and response lifecycle.
    Transport,
    /// Route matching.
    Routing,
    /// Middleware pipeline.
    Middleware,
    /// Controller dispatch.
    Controller,
    /// Data access: queries, results, connection errors.
    Database,
    /// Authentication and authorization.
    Auth,
    /// Cache reads and writes.
    Cache,
    /// View rendering.
    View,
    /// Background jobs.
    Jobs,
    /// Search queries.
    Search,
    /// Plugin loading and plugin events.
    Plugin,
    /// Outbound API calls.
    Api,
    /// Security checks.
    Security,
    /// Anything else.
    General,
}

impl Category {
    /// Number of categories.
    pub const COUNT: usize = 14;

    /// All categories in index order.
    pub const ALL: [Category; Self::COUNT] = [
        Self::Transport,
        Self::Routing,
        Self::Middleware,
        Self::Controller,
        Self::Database,
        Self::Auth,
        Self::Cache,
        Self::View,
        Self::Jobs,
        Self::Search,
        Self::Plugin,
        Self::Api,
        Self::Security,
        Self::General,
    ];

    /// Returns the dense index of this category (`0..COUNT`).
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the kebab-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Routing => "routing",
            Self::Middleware => "middleware",
            Self::Controller => "controller",
            Self::Database => "database",
            Self::Auth => "auth",
            Self::Cache => "cache",
            Self::View => "view",
            Self::Jobs => "jobs",
            Self::Search => "search",
            Self::Plugin => "plugin",
            Self::Api => "api",
            Self::Security => "security",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        let found = match lowered.as_str() {
            "http" => Some(Self::Transport),
            "route" => Some(Self::Routing),
            "db" | "data-access" | "orm" => Some(Self::Database),
            "authentication" => Some(Self::Auth),
            "render" | "rendering" => Some(Self::View),
            "job" | "background-jobs" => Some(Self::Jobs),
            other => Self::ALL.into_iter().find(|c| c.name() == other),
        };
        found.ok_or_else(|| Error::invalid_category(s.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
