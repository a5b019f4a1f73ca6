//! Event severities.
//!
//! Severities are totally ordered by verbosity: `Off < Error < Warn < Info < Debug < Trace`.
//! A higher ordinal means a more verbose event. `Off` is only meaningful as a
//! threshold; used as one it enables nothing, not even `Error`.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Verbosity rank of an event, used for filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    /// Nothing is recorded.
    Off = 0,
    /// Failures.
    Error = 1,
    /// Suspicious but recoverable conditions.
    Warn = 2,
    /// Normal lifecycle information.
    #[default]
    Info = 3,
    /// Detailed diagnostics.
    Debug = 4,
    /// Everything, including per-step chatter.
    Trace = 5,
}

impl Severity {
    /// All severities in ascending ordinal order.
    pub const ALL: [Severity; 6] = [
        Self::Off,
        Self::Error,
        Self::Warn,
        Self::Info,
        Self::Debug,
        Self::Trace,
    ];

    /// Returns the numeric rank (0 for `Off`, 5 for `Trace`).
    #[must_use]
    #[inline]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Converts a numeric rank back into a severity.
    ///
    /// # Errors
    ///
    /// Returns an invalid-severity error if `ordinal` is above 5.
    pub fn from_ordinal(ordinal: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(ordinal))
            .copied()
            .ok_or_else(|| Error::invalid_severity(ordinal.to_string()))
    }

    /// Returns true if an event of this severity passes a filter set to `threshold`.
    ///
    /// `Off` events never pass, and an `Off` threshold passes nothing.
    #[must_use]
    #[inline]
    pub const fn passes(self, threshold: Severity) -> bool {
        let ordinal = self as u8;
        ordinal != 0 && ordinal <= threshold as u8
    }

    /// Returns the lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(Error::invalid_severity(s.to_string())),
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_ordinal(value)
    }
}

// =============================================================================
// Tests
// =============================================================================
