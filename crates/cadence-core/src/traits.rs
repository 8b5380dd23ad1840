//! Collaborator traits consumed by the experiment controller.
//!
//! The controller never executes simulation logic itself: it drives a
//! [`SimulationJob`] built by a [`JobFactory`], and surfaces outcomes
//! through a [`StatusReporter`] and, ultimately, a [`Transport`].

use crate::error::{ControlError, LoadError, StepError, TransportError};
use crate::id::{CycleId, ExperimentId};
use crate::message::{ExperimentEvent, StatusMessage};
use crate::params::ExperimentParams;

/// A runnable simulation unit owned by the controller.
///
/// The job is held in the controller's job slot behind a mutex: the run
/// loop locks it to execute steps, the command processor locks it only
/// while the run loop is blocked (pause, reload, back-step). The trait
/// therefore requires `Send` but not `Sync`.
pub trait SimulationJob: Send {
    /// Execute one discrete forward step.
    ///
    /// Returns the cycle reached. A failed step is transient: the run
    /// loop reports it and continues.
    fn do_step(&mut self) -> Result<CycleId, StepError>;

    /// Undo one step, restoring the previous simulation state.
    ///
    /// Returns the cycle reached. Must be safely retryable: a failure
    /// leaves the job in a state where a later back-step or forward
    /// step is still legal.
    fn do_back_step(&mut self) -> Result<CycleId, StepError>;

    /// The current position of the simulation scope.
    fn cycle(&self) -> CycleId;

    /// Whether the stop condition holds on the current scope.
    ///
    /// Evaluated by the run loop before every step.
    fn stop_condition_met(&self) -> bool;

    /// Whether the job has been cancelled externally.
    fn is_interrupted(&self) -> bool;

    /// Release the job's resources. Called exactly once per job.
    fn dispose(&mut self);
}

/// Builds a [`SimulationJob`] from experiment parameters.
///
/// OPEN and RELOAD both go through the factory, so a reload rebuilds
/// the job from exactly the parameters the original open used.
pub trait JobFactory: Send + Sync {
    /// Build a fresh job.
    fn build(&self, params: &ExperimentParams) -> Result<Box<dyn SimulationJob>, LoadError>;
}

/// Receives errors and lifecycle events from the controller.
///
/// Implementations must be cheap and non-blocking: the run loop calls
/// into the reporter from its hot path.
pub trait StatusReporter: Send + Sync {
    /// Report an error that was caught at a dispatch or step boundary.
    fn report_error(&self, experiment: ExperimentId, error: &ControlError);

    /// Deliver a lifecycle or runtime event.
    fn notify(&self, experiment: ExperimentId, event: ExperimentEvent);
}

/// Delivers typed status messages to a remote peer.
///
/// The controller depends only on this `send` capability; message
/// serialization and framing are the implementation's business.
pub trait Transport: Send + Sync {
    /// Deliver one message.
    fn send(&self, message: StatusMessage) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, message: StatusMessage) -> Result<(), TransportError> {
        (**self).send(message)
    }
}

impl<T: StatusReporter + ?Sized> StatusReporter for std::sync::Arc<T> {
    fn report_error(&self, experiment: ExperimentId, error: &ControlError) {
        (**self).report_error(experiment, error)
    }

    fn notify(&self, experiment: ExperimentId, event: ExperimentEvent) {
        (**self).notify(experiment, event)
    }
}
