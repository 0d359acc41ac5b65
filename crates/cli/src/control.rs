//! The shared control block coordinating the receive and transmit
//! threads.
//!
//! One mutex guards every field; the condvar alongside it is the
//! new-message wakeup the receive thread fires after each dispatch.
//! Flag discipline: the receive side sets `busy`/`ask`/`completed`/
//! `exec`/`prompt`/`helped`, the transmit side clears them. `exit` is
//! the exception: either side sets it on fatal conditions and both
//! observe it. Critical sections stay short: callers copy what they
//! need, unlock, then act. No I/O happens under the lock.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use logging::DEFAULT_PRIORITY;
use protocol::Message;

/// State shared between the receive and transmit threads.
///
/// Prompt-class payloads hold the *latest* value only: a second ASK or
/// PROMPT arriving before the first is consumed overwrites it. That
/// loss is part of the wire contract; servers wait for the reply.
#[derive(Debug)]
pub(crate) struct ControlBlock {
    /// Server is busy; the transmit side spins until cleared.
    pub busy: bool,
    /// An ASK awaits an answer; the full frame is in `ask_msg`.
    pub ask: bool,
    /// Latest captured ASK frame.
    pub ask_msg: Option<Message>,
    /// A COMPLETED reply arrived; replacement line in `completed_str`.
    pub completed: bool,
    /// Latest completion, stored without its trailing CRLF.
    pub completed_str: Vec<u8>,
    /// An EXEC request awaits handling; command in `exec_str`.
    pub exec: bool,
    /// Latest exec command, stored without its trailing CRLF.
    pub exec_str: Vec<u8>,
    /// A PROMPT awaits the user; prompt text in `prompt_str`.
    pub prompt: bool,
    /// Latest prompt, stored without its trailing CRLF.
    pub prompt_str: Vec<u8>,
    /// A HELPED acknowledgment arrived.
    pub helped: bool,
    /// Counts DISPLAY frames; editor callbacks compare snapshots to
    /// detect output that arrived during their waits.
    pub display: u32,
    /// Whether DISPLAY output should go through the pager.
    pub usepager: bool,
    /// Session teardown requested; both threads honor it promptly.
    pub exit: bool,
    /// Mirror of the logging sink choice for the receive thread.
    pub use_syslog: bool,
    /// Mirror of the logging threshold for the receive thread.
    pub logprio: u8,
}

impl Default for ControlBlock {
    fn default() -> Self {
        Self {
            busy: false,
            ask: false,
            ask_msg: None,
            completed: false,
            completed_str: Vec::new(),
            exec: false,
            exec_str: Vec::new(),
            prompt: false,
            prompt_str: Vec::new(),
            helped: false,
            display: 0,
            usepager: false,
            exit: false,
            use_syslog: true,
            logprio: DEFAULT_PRIORITY.as_u8(),
        }
    }
}

/// The control block together with its mutex and wakeup condvar.
#[derive(Debug, Default)]
pub(crate) struct Control {
    state: Mutex<ControlBlock>,
    wake: Condvar,
}

impl Control {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the block. A poisoned lock is taken over rather than
    /// propagated: the flags stay meaningful even if a peer panicked.
    pub fn lock(&self) -> MutexGuard<'_, ControlBlock> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wakes anyone blocked in [`Control::wait_for_wake`].
    pub fn notify(&self) {
        self.wake.notify_all();
    }

    /// Sleeps until a wakeup or `timeout`, whichever is first.
    pub fn wait_for_wake(&self, timeout: Duration) {
        let guard = self.lock();
        let _ = self
            .wake
            .wait_timeout(guard, timeout)
            .map(|(guard, _)| drop(guard));
    }

    /// Marks the session for teardown and wakes both threads.
    pub fn request_exit(&self) {
        self.lock().exit = true;
        self.notify();
    }

    /// Whether teardown has been requested.
    pub fn exit_requested(&self) -> bool {
        self.lock().exit
    }
}
