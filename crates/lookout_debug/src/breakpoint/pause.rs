//! The engine-wide pause latch.
//!
//! A single latch is shared by every pause breakpoint. The first pause arms it
//! and blocks; any pause that arrives while it is armed joins the same cycle
//! and is released by the same `resume`. Resuming an unarmed latch does
//! nothing.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::info;

use super::BreakpointId;
use crate::event::Event;

/// Where the latch was armed.
#[derive(Clone, Debug)]
pub struct PausedAt {
    /// The breakpoint that paused.
    pub breakpoint_id: BreakpointId,
    /// Its name.
    pub name: String,
    /// The event that triggered it.
    pub event: Arc<Event>,
}

#[derive(Default)]
struct LatchState {
    paused: bool,
    /// Bumped on every resume. A waiter is released once the cycle it joined ends.
    cycle: u64,
    at: Option<PausedAt>,
    waiting: usize,
}

/// Blocks calling flows until an external resume.
#[derive(Default)]
pub struct PauseLatch {
    state: Mutex<LatchState>,
    signal: Condvar,
}

impl PauseLatch {
    /// Creates an unarmed latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the latch (or joins the armed cycle) and blocks until resumed.
    ///
    /// There is no timeout. Use [`pause_timeout`](Self::pause_timeout) for a
    /// bounded wait.
    pub fn pause(&self, at: PausedAt) {
        let mut state = self.state.lock();
        let cycle = self.enter(&mut state, at);
        while state.paused && state.cycle == cycle {
            self.signal.wait(&mut state);
        }
        state.waiting -= 1;
    }

    /// Like [`pause`](Self::pause) but gives up after `timeout`.
    ///
    /// Returns true if released by a resume, false on timeout. A timed-out
    /// waiter leaves the latch armed for everyone else.
    pub fn pause_timeout(&self, at: PausedAt, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        let cycle = self.enter(&mut state, at);
        while state.paused && state.cycle == cycle {
            if self.signal.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.waiting -= 1;
        !(state.paused && state.cycle == cycle)
    }

    fn enter(&self, state: &mut LatchState, at: PausedAt) -> u64 {
        if !state.paused {
            info!(
                target: "lookout::breakpoint",
                breakpoint = %at.breakpoint_id,
                name = %at.name,
                event = at.event.id,
                "paused; waiting for resume"
            );
            state.paused = true;
            state.at = Some(at);
            // Wake anyone waiting for a pause to begin.
            self.signal.notify_all();
        }
        state.waiting += 1;
        state.cycle
    }

    /// Releases every flow blocked in the current cycle.
    ///
    /// Returns false, and does nothing, if the latch was not armed.
    pub fn resume(&self) -> bool {
        let mut state = self.state.lock();
        if !state.paused {
            return false;
        }
        state.paused = false;
        state.at = None;
        state.cycle += 1;
        self.signal.notify_all();
        info!(target: "lookout::breakpoint", "resumed");
        true
    }

    /// Returns true while the latch is armed.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Returns the number of flows currently blocked on the latch.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.state.lock().waiting
    }

    /// Returns where the latch was armed, while it is armed.
    #[must_use]
    pub fn paused_at(&self) -> Option<PausedAt> {
        self.state.lock().at.clone()
    }

    /// Blocks until the latch is armed or `timeout` elapses. Returns whether it is armed.
    pub fn wait_until_paused(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.paused {
            if self.signal.wait_until(&mut state, deadline).timed_out() {
                return state.paused;
            }
        }
        true
    }
}

impl fmt::Debug for PauseLatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("PauseLatch")
            .field("paused", &state.paused)
            .field("cycle", &state.cycle)
            .field("waiting", &state.waiting)
            .finish_non_exhaustive()
    }
}

/// Cloneable handle that resumes a latch, handed to callback breakpoints.
#[derive(Clone, Debug)]
pub struct ResumeHandle(Arc<PauseLatch>);

impl ResumeHandle {
    pub(crate) fn new(latch: Arc<PauseLatch>) -> Self {
        Self(latch)
    }

    /// Resumes the latch. Returns false if nothing was paused.
    pub fn resume(&self) -> bool {
        self.0.resume()
    }

    /// Returns true while the latch is armed.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.0.is_paused()
    }
}
