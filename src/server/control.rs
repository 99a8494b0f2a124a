//! Stop and reload requests.
//!
//! Requests are flags. Whoever holds a [`ControlHandle`] (signal thread,
//! tests, an embedding program) sets them; the server loop reads them once
//! per iteration and does the actual work on its own thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Flags {
    running: AtomicBool,
    reload: AtomicBool,
}

/// Loop-side view of the control flags.
#[derive(Debug)]
pub struct Control {
    flags: Arc<Flags>,
}

/// Cloneable, thread-safe way to ask a running server to stop or reload.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    flags: Arc<Flags>,
}

impl Control {
    /// New control in the running state.
    pub fn new() -> Self {
        Self {
            flags: Arc::new(Flags {
                running: AtomicBool::new(true),
                reload: AtomicBool::new(false),
            }),
        }
    }

    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            flags: Arc::clone(&self.flags),
        }
    }

    pub fn is_running(&self) -> bool {
        self.flags.running.load(Ordering::Acquire)
    }

    /// Consumes a pending reload request, if any.
    pub fn take_reload(&self) -> bool {
        self.flags.reload.swap(false, Ordering::AcqRel)
    }
}

impl Default for Control {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlHandle {
    /// Asks the loop to exit at the top of its next iteration.
    pub fn stop(&self) {
        self.flags.running.store(false, Ordering::Release);
    }

    /// Asks the loop to re-read configuration and content.
    pub fn request_reload(&self) {
        self.flags.reload.store(true, Ordering::Release);
    }
}
