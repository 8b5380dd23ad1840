//! Strongly-typed identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for unique [`ExperimentId`] allocation.
static EXPERIMENT_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies a live experiment session.
///
/// Status messages sent over a transport are keyed by this ID so that a
/// remote peer multiplexing several experiments over one connection can
/// route them. Allocate fresh IDs with [`ExperimentId::next`] or wrap an
/// externally assigned value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExperimentId(pub u64);

impl ExperimentId {
    /// Allocate a fresh, unique experiment ID.
    ///
    /// Each call returns a new ID that has never been returned before
    /// within this process. Thread-safe.
    pub fn next() -> Self {
        Self(EXPERIMENT_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ExperimentId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Monotonically increasing simulation cycle counter.
///
/// Incremented each time a job executes one forward step; decremented
/// by a successful back-step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleId(pub u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CycleId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_ids_are_unique() {
        let a = ExperimentId::next();
        let b = ExperimentId::next();
        assert_ne!(a, b);
    }
}
