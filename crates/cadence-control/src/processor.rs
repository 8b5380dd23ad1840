//! The command processor thread and the worker lease it belongs to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cadence_core::Command;
use crossbeam_channel::Receiver;

use crate::controller::Inner;
use crate::gate::PauseGate;
use crate::mailbox::Mailbox;

/// The worker bundle owned by one controller generation.
///
/// Reload swaps the whole lease rather than mutating fields one by one,
/// so the controller is never observable in a half-rebuilt state: old
/// gate, mailbox, and threads go out together; fresh ones come in
/// together.
pub(crate) struct WorkerLease {
    /// The pause gate the current run loop blocks on.
    pub gate: Arc<PauseGate>,
    /// Cleared to retire this lease's processor thread.
    pub accepting: Arc<AtomicBool>,
    /// Enqueue half of the command mailbox. Taken (dropped) at
    /// teardown to disconnect the channel and unblock `recv()`.
    pub mailbox: Option<Mailbox>,
    /// The command processor thread.
    pub processor: Option<JoinHandle<()>>,
    /// The run loop thread, present once START or STEP launched it.
    pub run_loop: Option<JoinHandle<()>>,
}

impl WorkerLease {
    /// An inert placeholder used only while the controller is being
    /// constructed; it accepts nothing and owns no threads.
    pub fn idle() -> Self {
        Self {
            gate: Arc::new(PauseGate::new()),
            accepting: Arc::new(AtomicBool::new(false)),
            mailbox: None,
            processor: None,
            run_loop: None,
        }
    }

    /// Create a fresh lease: new gate, new mailbox, and a running
    /// processor thread. The run loop is launched lazily by START or
    /// STEP (or by reload, which wants a parked loop in place).
    pub fn start(inner: &Arc<Inner>) -> Self {
        let (mailbox, rx) = Mailbox::new(inner.config.command_capacity);
        let gate = Arc::new(PauseGate::new());
        let accepting = Arc::new(AtomicBool::new(true));

        let thread_inner = Arc::clone(inner);
        let thread_accepting = Arc::clone(&accepting);
        let processor = thread::Builder::new()
            .name(format!("{}-cmd", inner.config.thread_name))
            .spawn(move || processor_loop(thread_inner, rx, thread_accepting))
            .expect("failed to spawn command processor thread");

        Self {
            gate,
            accepting,
            mailbox: Some(mailbox),
            processor: Some(processor),
            run_loop: None,
        }
    }

    /// Whether this lease's run loop thread is currently live.
    pub fn run_loop_live(&self) -> bool {
        self.run_loop.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// Drain the mailbox in arrival order until retired.
///
/// Dispatch failures are caught and reported at the dispatch boundary
/// inside [`Inner::process`]; nothing escapes to kill this thread. The
/// loop ends when the lease stops accepting, when the shutdown sentinel
/// lets it observe that, or when the mailbox is disconnected.
fn processor_loop(inner: Arc<Inner>, rx: Receiver<Command>, accepting: Arc<AtomicBool>) {
    while accepting.load(Ordering::Acquire) {
        match rx.recv() {
            // The sentinel is not a user action: just re-check the flag.
            Ok(Command::Shutdown) => continue,
            // Errors were already reported inside process().
            Ok(cmd) => {
                let _ = inner.process(cmd);
            }
            // Sender dropped at teardown.
            Err(_) => break,
        }
    }
    tracing::debug!(experiment = %inner.id, "command processor retired");
}
