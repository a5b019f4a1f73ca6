//! Level filtering.
//!
//! A [`LevelFilter`] holds a global severity threshold plus optional
//! per-category overrides and answers "is this event enabled" with two array
//! reads. [`LevelPreset`]s are named configurations applied purely through
//! the filter's public setters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::severity::Severity;

// =============================================================================
// Level Filter
// =============================================================================

/// Global threshold plus per-category overrides.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelFilter {
    /// Threshold used by categories without an override.
    global: Severity,
    /// Per-category overrides, indexed by [`Category::index`].
    overrides: [Option<Severity>; Category::COUNT],
}

impl LevelFilter {
    /// Creates a filter with the given global threshold and no overrides.
    #[must_use]
    pub const fn new(global: Severity) -> Self {
        Self {
            global,
            overrides: [None; Category::COUNT],
        }
    }

    /// Returns the global threshold.
    #[must_use]
    pub const fn global(&self) -> Severity {
        self.global
    }

    /// Sets the global threshold.
    pub fn set_global(&mut self, severity: Severity) {
        self.global = severity;
    }

    /// Overrides the threshold for one category.
    pub fn set_category(&mut self, category: Category, severity: Severity) {
        self.overrides[category.index()] = Some(severity);
    }

    /// Removes the override for one category.
    pub fn clear_category(&mut self, category: Category) {
        self.overrides[category.index()] = None;
    }

    /// Removes every category override.
    pub fn clear_all_categories(&mut self) {
        self.overrides = [None; Category::COUNT];
    }

    /// Returns the override for a category, if one is set.
    #[must_use]
    pub const fn category_override(&self, category: Category) -> Option<Severity> {
        self.overrides[category.index()]
    }

    /// Returns the threshold in force for a category.
    #[must_use]
    #[inline]
    pub const fn effective(&self, category: Category) -> Severity {
        match self.overrides[category.index()] {
            Some(severity) => severity,
            None => self.global,
        }
    }

    /// Returns true if an event of `severity` in `category` should be recorded.
    #[must_use]
    #[inline]
    pub const fn enabled(&self, category: Category, severity: Severity) -> bool {
        severity.passes(self.effective(category))
    }

    /// Returns all category overrides currently set.
    #[must_use]
    pub fn overrides(&self) -> Vec<(Category, Severity)> {
        Category::ALL
            .into_iter()
            .filter_map(|c| self.category_override(c).map(|s| (c, s)))
            .collect()
    }

    /// Reconfigures this filter according to a preset.
    pub fn apply(&mut self, preset: LevelPreset) {
        preset.apply_to(self);
    }
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self::new(Severity::Info)
    }
}

impl From<LevelPreset> for LevelFilter {
    fn from(preset: LevelPreset) -> Self {
        let mut filter = Self::default();
        filter.apply(preset);
        filter
    }
}

// =============================================================================
// Level Preset
// =============================================================================

/// Named filter configurations.
///
/// Every preset clears existing overrides and then uses only
/// [`LevelFilter::set_global`] and [`LevelFilter::set_category`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LevelPreset {
    /// Record nothing.
    Silent,
    /// Errors only.
    ErrorsOnly,
    /// Warnings and errors.
    Production,
    /// Everything up to `Debug`.
    #[default]
    Development,
    /// Everything.
    Verbose,
    /// One category at `Trace`, everything else off.
    Focus(Category),
}

impl LevelPreset {
    /// Applies this preset to a filter.
    pub fn apply_to(self, filter: &mut LevelFilter) {
        filter.clear_all_categories();
        match self {
            Self::Silent => filter.set_global(Severity::Off),
            Self::ErrorsOnly => filter.set_global(Severity::Error),
            Self::Production => filter.set_global(Severity::Warn),
            Self::Development => filter.set_global(Severity::Debug),
            Self::Verbose => filter.set_global(Severity::Trace),
            Self::Focus(category) => {
                filter.set_global(Severity::Off);
                filter.set_category(category, Severity::Trace);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
