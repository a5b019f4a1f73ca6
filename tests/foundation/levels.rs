//! Integration tests for severity ordering and level filtering
//!
//! Tests parsing, ordering, per-category overrides, and presets.

use lookout_foundation::{Category, LevelFilter, LevelPreset, Severity};
use proptest::prelude::*;

// =============================================================================
// Severity
// =============================================================================

#[test]
fn severity_order_runs_from_off_to_trace() {
    let mut sorted = vec![
        Severity::Trace,
        Severity::Error,
        Severity::Info,
        Severity::Off,
        Severity::Debug,
        Severity::Warn,
    ];
    sorted.sort();
    assert_eq!(sorted, Severity::ALL.to_vec());
}

#[test]
fn severity_parses_names_and_aliases() {
    assert_eq!("WARNING".parse::<Severity>().unwrap(), Severity::Warn);
    assert_eq!(" debug ".parse::<Severity>().unwrap(), Severity::Debug);
    assert_eq!("none".parse::<Severity>().unwrap(), Severity::Off);
    assert!("loud".parse::<Severity>().is_err());
}

#[test]
fn severity_ordinals() {
    for severity in Severity::ALL {
        assert_eq!(Severity::try_from(severity.ordinal()).unwrap(), severity);
    }
    assert!(Severity::from_ordinal(6).is_err());
}

#[test]
fn off_events_never_pass() {
    for threshold in Severity::ALL {
        assert!(!Severity::Off.passes(threshold));
    }
}

// =============================================================================
// Category
// =============================================================================

#[test]
fn category_names_round_trip() {
    for category in Category::ALL {
        assert_eq!(category.name().parse::<Category>().unwrap(), category);
        assert_eq!(Category::ALL[category.index()], category);
    }
    assert!("kitchen".parse::<Category>().is_err());
}

#[test]
fn category_display_honours_width() {
    assert_eq!(format!("{:<8}|", Category::Api), "api     |");
}

// =============================================================================
// Level Filter
// =============================================================================

#[test]
fn global_threshold_gates_every_category() {
    let filter = LevelFilter::new(Severity::Warn);
    for category in Category::ALL {
        assert!(filter.enabled(category, Severity::Error));
        assert!(filter.enabled(category, Severity::Warn));
        assert!(!filter.enabled(category, Severity::Info));
    }
}

#[test]
fn override_raises_one_category() {
    let mut filter = LevelFilter::new(Severity::Error);
    filter.set_category(Category::Database, Severity::Trace);

    assert!(filter.enabled(Category::Database, Severity::Trace));
    assert!(!filter.enabled(Category::Cache, Severity::Warn));
    assert_eq!(filter.overrides(), vec![(Category::Database, Severity::Trace)]);
}

#[test]
fn focus_preset_isolates_a_category() {
    let filter = LevelFilter::from(LevelPreset::Focus(Category::Auth));
    assert!(filter.enabled(Category::Auth, Severity::Trace));
    assert!(!filter.enabled(Category::Transport, Severity::Error));
}

#[test]
fn presets_clear_previous_overrides() {
    let mut filter = LevelFilter::default();
    filter.set_category(Category::Cache, Severity::Trace);
    filter.apply(LevelPreset::Production);

    assert_eq!(filter.global(), Severity::Warn);
    assert_eq!(filter.category_override(Category::Cache), None);
    assert!(!filter.enabled(Category::Cache, Severity::Info));
}

#[test]
fn silent_preset_records_nothing() {
    let filter = LevelFilter::from(LevelPreset::Silent);
    for category in Category::ALL {
        assert!(!filter.enabled(category, Severity::Error));
    }
}

proptest! {
    #[test]
    fn overrides_only_touch_their_category(
        global in 0u8..=5,
        level in 0u8..=5,
        target in 0..Category::COUNT,
    ) {
        let global = Severity::from_ordinal(global).unwrap();
        let level = Severity::from_ordinal(level).unwrap();
        let target = Category::ALL[target];

        let mut filter = LevelFilter::new(global);
        filter.set_category(target, level);

        for category in Category::ALL {
            let expected = if category == target { level } else { global };
            prop_assert_eq!(filter.effective(category), expected);
        }
        prop_assert_eq!(filter.overrides(), vec![(target, level)]);

        filter.clear_category(target);
        prop_assert!(filter.overrides().is_empty());
    }
}
