//! Bridging controller events onto a remote transport.

use cadence_core::{
    ControlError, ExperimentEvent, ExperimentId, StatusBody, StatusMessage, StatusReporter,
    Transport,
};

/// A [`StatusReporter`] that forwards everything to a [`Transport`].
///
/// The run loop and command processor only ever talk to the reporter
/// interface; wiring a `TransportReporter` in is what turns controller
/// events into status messages on the remote peer's connection. Send
/// failures are logged and swallowed — a dead socket must not take the
/// run loop down with it.
pub struct TransportReporter<T: Transport> {
    transport: T,
}

impl<T: Transport> TransportReporter<T> {
    /// Wrap a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: Transport> StatusReporter for TransportReporter<T> {
    fn report_error(&self, experiment: ExperimentId, error: &ControlError) {
        let message = StatusMessage {
            experiment,
            body: StatusBody::Error(error.clone()),
        };
        if let Err(e) = self.transport.send(message) {
            tracing::warn!(%experiment, error = %e, "failed to deliver error report");
        }
    }

    fn notify(&self, experiment: ExperimentId, event: ExperimentEvent) {
        let message = StatusMessage {
            experiment,
            body: StatusBody::Event(event),
        };
        if let Err(e) = self.transport.send(message) {
            tracing::warn!(%experiment, error = %e, "failed to deliver event");
        }
    }
}
