//! Error types for experiment control.
//!
//! Organized by failure site: job construction ([`LoadError`]), step
//! execution ([`StepError`]), command dispatch ([`ControlError`]), and
//! message delivery ([`TransportError`]).

use std::error::Error;
use std::fmt;

/// Errors from building a simulation job out of experiment parameters.
///
/// Raised by [`JobFactory::build`](crate::JobFactory::build) during OPEN
/// and RELOAD. A load failure leaves the controller paused and available
/// for a retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadError {
    /// A required parameter is absent.
    MissingParameter {
        /// Name of the missing parameter.
        name: String,
    },
    /// A parameter is present but unusable.
    InvalidParameter {
        /// Name of the offending parameter.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// The model itself failed to build.
    BuildFailed {
        /// Description of the build failure.
        reason: String,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParameter { name } => write!(f, "missing parameter '{name}'"),
            Self::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{name}': {reason}")
            }
            Self::BuildFailed { reason } => write!(f, "job build failed: {reason}"),
        }
    }
}

impl Error for LoadError {}

/// Errors from executing a single forward or backward step.
///
/// A forward-step failure is transient: the run loop reports it and
/// keeps going. A back-step failure aborts the remainder of the
/// requested batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepError {
    /// The step body failed at runtime.
    ExecutionFailed {
        /// Description of the failure.
        reason: String,
    },
    /// A back-step was requested but no earlier state is retained.
    NoHistory,
    /// The job was interrupted mid-step (cancellation).
    Interrupted,
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "step execution failed: {reason}"),
            Self::NoHistory => write!(f, "no earlier state to step back to"),
            Self::Interrupted => write!(f, "job interrupted"),
        }
    }
}

impl Error for StepError {}

/// Errors from dispatching a control command.
///
/// All dispatch failures are caught at the dispatch boundary: queued
/// commands convert them into reported errors, direct (synchronous)
/// calls return them to the caller. None of them crash the command
/// thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlError {
    /// The command requires a loaded job and none is present.
    NoJob,
    /// The command requires the controller to be paused.
    NotPaused,
    /// The run reached its end; STEP and START are refused until the
    /// job is rebuilt by RELOAD (or a fresh OPEN).
    Ended,
    /// Teardown has begun; the command was refused.
    Disposing,
    /// The job could not be (re)built.
    Load(LoadError),
    /// A step or back-step failed.
    Step(StepError),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoJob => write!(f, "no job loaded"),
            Self::NotPaused => write!(f, "controller is not paused"),
            Self::Ended => write!(f, "run has ended"),
            Self::Disposing => write!(f, "controller is disposing"),
            Self::Load(e) => write!(f, "load failed: {e}"),
            Self::Step(e) => write!(f, "step failed: {e}"),
        }
    }
}

impl Error for ControlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(e) => Some(e),
            Self::Step(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LoadError> for ControlError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

impl From<StepError> for ControlError {
    fn from(e: StepError) -> Self {
        Self::Step(e)
    }
}

/// Errors from delivering a status message to a remote peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The connection is gone.
    Closed,
    /// The transport failed to deliver the message.
    SendFailed {
        /// Description of the delivery failure.
        reason: String,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "transport closed"),
            Self::SendFailed { reason } => write!(f, "send failed: {reason}"),
        }
    }
}

impl Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_error_chains_source() {
        let e = ControlError::Load(LoadError::MissingParameter {
            name: "stop_at".into(),
        });
        let src = e.source().expect("load error should chain");
        assert_eq!(src.to_string(), "missing parameter 'stop_at'");
    }

    #[test]
    fn display_is_human_readable() {
        let e = ControlError::Step(StepError::ExecutionFailed {
            reason: "division by zero".into(),
        });
        assert_eq!(
            e.to_string(),
            "step failed: step execution failed: division by zero"
        );
    }
}
