//! Controller configuration and validation.

use std::error::Error;
use std::fmt;

use crate::mailbox::DEFAULT_COMMAND_CAPACITY;

/// Configuration for an [`ExperimentController`](crate::ExperimentController).
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Capacity of the bounded command mailbox. Default: 10.
    ///
    /// Commands offered to a full mailbox are silently dropped, so the
    /// capacity bounds how far callers can run ahead of the processor.
    pub command_capacity: usize,
    /// Base name for the controller's threads. The processor thread is
    /// named `{name}-cmd`, the run loop `{name}-run`. Default: `"cadence"`.
    pub thread_name: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            thread_name: "cadence".into(),
        }
    }
}

impl ControllerConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command_capacity == 0 {
            return Err(ConfigError::ZeroCommandCapacity);
        }
        Ok(())
    }
}

/// Errors detected during [`ControllerConfig::validate()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A zero-capacity mailbox would drop every command.
    ZeroCommandCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCommandCapacity => write!(f, "command mailbox capacity must be nonzero"),
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(ControllerConfig::default().validate(), Ok(()));
        assert_eq!(
            ControllerConfig::default().command_capacity,
            DEFAULT_COMMAND_CAPACITY
        );
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = ControllerConfig {
            command_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCommandCapacity));
    }
}
