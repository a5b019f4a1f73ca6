//! The process-wide debugger.
//!
//! Applications that do not want to thread a [`Debugger`] through every
//! layer install one here at startup. Anything that asks before installation
//! gets a debugger built from the default configuration, and installation
//! fails from then on.

use std::sync::Arc;

use lookout_debug::{Debugger, Recorder};
use once_cell::sync::OnceCell;
use tracing::info;

static DEBUGGER: OnceCell<Debugger> = OnceCell::new();

/// Installs the process-wide debugger.
///
/// # Errors
///
/// Returns the debugger back if one is already installed.
pub fn install(debugger: Debugger) -> Result<(), Debugger> {
    DEBUGGER.set(debugger)?;
    info!(target: "lookout::runtime", "process-wide debugger installed");
    Ok(())
}

/// Returns the process-wide debugger, creating a default one on first use.
pub fn debugger() -> &'static Debugger {
    DEBUGGER.get_or_init(Debugger::default)
}

/// Returns the process-wide debugger if one exists yet.
pub fn try_debugger() -> Option<&'static Debugger> {
    DEBUGGER.get()
}

/// Returns the process-wide recorder.
pub fn recorder() -> &'static Arc<Recorder> {
    debugger().recorder()
}
