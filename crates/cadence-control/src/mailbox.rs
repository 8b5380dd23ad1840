//! Bounded, ordered mailbox of control commands.
//!
//! A thin wrapper over a bounded crossbeam channel. Enqueue never
//! blocks: a full mailbox drops the attempt on the floor, which is the
//! documented contract for callers on UI or network threads. The
//! processor side drains the plain [`Receiver`] with blocking `recv()`;
//! teardown unblocks it with the [`Command::Shutdown`] sentinel and by
//! dropping the sender half.

use cadence_core::Command;
use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Default mailbox capacity.
pub const DEFAULT_COMMAND_CAPACITY: usize = 10;

/// The enqueue half of a command mailbox.
pub struct Mailbox {
    tx: Sender<Command>,
}

impl Mailbox {
    /// Create a mailbox and the receiver the processor thread drains.
    pub fn new(capacity: usize) -> (Self, Receiver<Command>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self { tx }, rx)
    }

    /// Offer a command without blocking.
    ///
    /// Returns `true` if the command was accepted. A full or
    /// disconnected mailbox drops the command; the caller is never
    /// blocked and never sees an error.
    pub fn offer(&self, command: Command) -> bool {
        match self.tx.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(cmd)) => {
                tracing::debug!(command = ?cmd, "command dropped: mailbox full");
                false
            }
            Err(TrySendError::Disconnected(cmd)) => {
                tracing::debug!(command = ?cmd, "command dropped: mailbox disconnected");
                false
            }
        }
    }
}
