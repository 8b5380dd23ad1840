//! Status events and transport messages.

use crate::error::ControlError;
use crate::id::{CycleId, ExperimentId};

/// An asynchronous event emitted by the controller.
///
/// Events reach callers through the
/// [`StatusReporter`](crate::StatusReporter) collaborator, never as
/// return values of the command-enqueue path.
#[derive(Clone, Debug, PartialEq)]
pub enum ExperimentEvent {
    /// The stop condition held; the run loop has terminated.
    SimulationEnded {
        /// The cycle at which the run ended.
        cycle: CycleId,
    },
    /// A back-step batch was cut short by a failure.
    BackStepAborted {
        /// How many requested back-steps were abandoned.
        remaining: usize,
        /// Description of the failure.
        reason: String,
    },
    /// The job was rebuilt in place from the stored parameters.
    Reloaded,
    /// Teardown of the experiment is complete.
    Disposed,
}

/// A status message addressed to a remote peer.
///
/// The experiment ID lets a peer multiplexing several experiments over
/// one connection route the payload. Serialization and framing belong
/// to the transport implementation.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusMessage {
    /// The experiment this message concerns.
    pub experiment: ExperimentId,
    /// The message body.
    pub body: StatusBody,
}

/// The body of a [`StatusMessage`].
#[derive(Clone, Debug, PartialEq)]
pub enum StatusBody {
    /// A lifecycle or runtime event.
    Event(ExperimentEvent),
    /// An error surfaced from command dispatch or step execution.
    Error(ControlError),
}
