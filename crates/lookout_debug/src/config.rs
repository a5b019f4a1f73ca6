//! Configuration for the debugger.

use lookout_foundation::LevelPreset;

/// Configuration for the debugger.
///
/// Controls level filtering, buffer sizes, and history retention.
#[derive(Clone, Debug)]
pub struct DebuggerConfig {
    /// Whether recording is enabled (false = every emit returns immediately).
    pub enabled: bool,

    /// Initial level filter configuration.
    pub levels: LevelPreset,

    /// Global event ring buffer size.
    pub event_buffer_size: usize,

    /// Number of request reports retained by the aggregator.
    pub max_history: usize,

    /// Number of completed global spans retained.
    pub global_span_history: usize,

    /// Capacity of the fault channel before faults are dropped.
    pub fault_capacity: usize,

    /// Number of breakpoint hits retained in the hit log.
    pub hit_log_size: usize,

    /// Whether inspect breakpoints capture a call-context backtrace.
    pub capture_call_context: bool,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            levels: LevelPreset::Development,
            event_buffer_size: 1000,
            max_history: 100,
            global_span_history: 100,
            fault_capacity: 256,
            hit_log_size: 100,
            capture_call_context: true,
        }
    }
}

impl DebuggerConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for development: `Debug` levels, call contexts captured.
    #[must_use]
    pub fn development() -> Self {
        Self::default()
    }

    /// Creates a configuration for production: warnings and errors only, no backtraces.
    #[must_use]
    pub fn production() -> Self {
        Self {
            levels: LevelPreset::Production,
            event_buffer_size: 500,
            capture_call_context: false,
            ..Self::default()
        }
    }

    /// Creates a configuration that records everything with larger buffers.
    #[must_use]
    pub fn verbose() -> Self {
        Self {
            levels: LevelPreset::Verbose,
            event_buffer_size: 10_000,
            max_history: 1000,
            ..Self::default()
        }
    }

    /// Builder method to set enabled state.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method to set the level preset.
    #[must_use]
    pub fn with_levels(mut self, levels: LevelPreset) -> Self {
        self.levels = levels;
        self
    }

    /// Builder method to set the event buffer size.
    #[must_use]
    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Builder method to set the report history size.
    #[must_use]
    pub fn with_max_history(mut self, size: usize) -> Self {
        self.max_history = size;
        self
    }

    /// Builder method to set the completed global span history size.
    #[must_use]
    pub fn with_global_span_history(mut self, size: usize) -> Self {
        self.global_span_history = size;
        self
    }

    /// Builder method to set the fault channel capacity.
    #[must_use]
    pub fn with_fault_capacity(mut self, capacity: usize) -> Self {
        self.fault_capacity = capacity;
        self
    }

    /// Builder method to set the breakpoint hit log size.
    #[must_use]
    pub fn with_hit_log_size(mut self, size: usize) -> Self {
        self.hit_log_size = size;
        self
    }

    /// Builder method to enable/disable call-context capture on inspect.
    #[must_use]
    pub fn with_call_context(mut self, capture: bool) -> Self {
        self.capture_call_context = capture;
        self
    }
}
