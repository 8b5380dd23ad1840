//! Symbolic control commands understood by the experiment controller.

/// A control command for an experiment.
///
/// Commands are enqueued by callers (UI actions, remote protocol
/// handlers) and applied in strict FIFO order by the controller's
/// command processor thread.
///
/// # Examples
///
/// ```
/// use cadence_core::Command;
///
/// // Wire codes match the remote protocol.
/// assert_eq!(Command::Start.code(), Some(1));
/// assert_eq!(Command::from_code(6), Some(Command::Reload));
///
/// // The shutdown sentinel is internal and has no wire encoding.
/// assert_eq!(Command::Shutdown.code(), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Load and build the simulation job from the stored parameters.
    Open,
    /// Leave the paused state and run freely until paused or ended.
    Start,
    /// Admit exactly one step, then return to the paused state.
    Step,
    /// Enter the paused state; the run loop blocks before its next step.
    Pause,
    /// Undo one step. Pauses first; only valid while paused.
    StepBack,
    /// Dispose the current job and rebuild it from the same parameters.
    /// Requires the controller to be paused.
    Reload,
    /// Begin teardown of the experiment.
    Close,
    /// Internal sentinel that unblocks the command thread at teardown.
    /// Never represents a user action and is not encodable on the wire.
    Shutdown,
}

impl Command {
    /// The wire code used by remote protocol handlers, if any.
    pub fn code(self) -> Option<i32> {
        match self {
            Self::Open => Some(0),
            Self::Start => Some(1),
            Self::Step => Some(2),
            Self::Pause => Some(3),
            Self::Reload => Some(6),
            Self::StepBack => Some(8),
            Self::Close => Some(-1),
            Self::Shutdown => None,
        }
    }

    /// Decode a wire code into a command.
    ///
    /// Returns `None` for unknown codes. The shutdown sentinel is
    /// deliberately not decodable: remote peers cannot inject it.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Open),
            1 => Some(Self::Start),
            2 => Some(Self::Step),
            3 => Some(Self::Pause),
            6 => Some(Self::Reload),
            8 => Some(Self::StepBack),
            -1 => Some(Self::Close),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_are_stable() {
        // These codes are part of the remote protocol and must not drift.
        assert_eq!(Command::Open.code(), Some(0));
        assert_eq!(Command::Start.code(), Some(1));
        assert_eq!(Command::Step.code(), Some(2));
        assert_eq!(Command::Pause.code(), Some(3));
        assert_eq!(Command::Reload.code(), Some(6));
        assert_eq!(Command::StepBack.code(), Some(8));
        assert_eq!(Command::Close.code(), Some(-1));
    }

    #[test]
    fn shutdown_is_not_decodable() {
        for code in -16..=16 {
            assert_ne!(Command::from_code(code), Some(Command::Shutdown));
        }
    }
}
