//! Ready-made breakpoints.
//!
//! Each preset is an ordinary [`BreakpointEngine::add`] call with a canned
//! [`BreakpointSpec`]; the result can be toggled, capped, or removed like any
//! other breakpoint.

use std::time::Duration;

use lookout_foundation::{Category, Error, Result, Severity};
use regex::Regex;

use super::{BreakpointAction, BreakpointEngine, BreakpointId, BreakpointSpec};

/// Words that mark an auth event as a failure (matched case-insensitively).
const AUTH_FAILURE_WORDS: &[&str] = &[
    "fail",
    "denied",
    "invalid",
    "unauthorized",
    "unauthorised",
    "forbidden",
    "expired",
    "reject",
];

/// Inspects every `Error` event.
pub fn break_on_error(engine: &BreakpointEngine) -> BreakpointId {
    engine.add(
        BreakpointSpec::new("break-on-error")
            .severity(Severity::Error)
            .action(BreakpointAction::Inspect),
    )
}

/// Triggers on every event of one category.
pub fn break_on_category(
    engine: &BreakpointEngine,
    category: Category,
    action: BreakpointAction,
) -> BreakpointId {
    engine.add(
        BreakpointSpec::new(format!("break-on-category:{category}"))
            .category(category)
            .action(action),
    )
}

/// Triggers on events whose message matches a regular expression.
///
/// # Errors
///
/// Returns an invalid-pattern error if `pattern` does not compile.
pub fn break_on_message_pattern(
    engine: &BreakpointEngine,
    pattern: &str,
    action: BreakpointAction,
) -> Result<BreakpointId> {
    let regex = Regex::new(pattern).map_err(|e| Error::invalid_pattern(e.to_string()))?;
    Ok(engine.add(
        BreakpointSpec::new(format!("break-on-message:{pattern}"))
            .when(move |event| regex.is_match(&event.message))
            .action(action),
    ))
}

/// Inspects events whose measured duration exceeds `threshold`.
pub fn break_on_slow(engine: &BreakpointEngine, threshold: Duration) -> BreakpointId {
    engine.add(
        BreakpointSpec::new(format!("break-on-slow:{}ms", threshold.as_millis()))
            .when(move |event| event.duration.is_some_and(|d| d > threshold))
            .action(BreakpointAction::Inspect),
    )
}

/// Triggers on every event of one request.
pub fn break_on_request_id(
    engine: &BreakpointEngine,
    request_id: impl Into<String>,
    action: BreakpointAction,
) -> BreakpointId {
    let request_id = request_id.into();
    engine.add(
        BreakpointSpec::new(format!("break-on-request:{request_id}"))
            .when(move |event| event.is_for_request(&request_id))
            .action(action),
    )
}

/// Inspects auth events that read like a failure.
pub fn break_on_auth_failure(engine: &BreakpointEngine) -> BreakpointId {
    engine.add(
        BreakpointSpec::new("break-on-auth-failure")
            .category(Category::Auth)
            .when(|event| is_auth_failure(&event.message))
            .action(BreakpointAction::Inspect),
    )
}

fn is_auth_failure(message: &str) -> bool {
    let message = message.to_lowercase();
    AUTH_FAILURE_WORDS.iter().any(|word| message.contains(word))
}
