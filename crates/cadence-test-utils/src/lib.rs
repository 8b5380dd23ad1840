//! Test utilities and mock collaborators for Cadence development.
//!
//! Provides a scriptable [`SimulationJob`] with observable counters
//! ([`ScriptedJob`], [`JobStats`]), a [`JobFactory`] over it
//! ([`ScriptedFactory`]), and recording implementations of
//! [`StatusReporter`] and [`Transport`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cadence_core::{
    ControlError, CycleId, ExperimentEvent, ExperimentId, ExperimentParams, JobFactory, LoadError,
    ParamValue, SimulationJob, StatusMessage, StatusReporter, StepError, Transport, TransportError,
};

// ── JobStats ─────────────────────────────────────────────────────

/// Observable counters for one [`ScriptedJob`].
///
/// Tests hold the `Arc` and assert on it after driving the controller;
/// the job updates it from whichever thread executes it.
#[derive(Debug, Default)]
pub struct JobStats {
    steps: AtomicU64,
    back_steps: AtomicU64,
    disposals: AtomicU64,
    interrupted: AtomicBool,
}

impl JobStats {
    pub fn steps(&self) -> u64 {
        self.steps.load(Ordering::Acquire)
    }

    pub fn back_steps(&self) -> u64 {
        self.back_steps.load(Ordering::Acquire)
    }

    pub fn disposals(&self) -> u64 {
        self.disposals.load(Ordering::Acquire)
    }

    /// Flag the job as externally cancelled.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
    }
}

// ── ScriptedJob ──────────────────────────────────────────────────

/// A [`SimulationJob`] whose behavior is scripted per cycle.
///
/// Steps count upward from cycle 0. The stop condition holds once the
/// cycle reaches `stop_at` (if set). Forward steps listed in
/// `fail_steps` fail after advancing — the step happened, it just went
/// wrong — so a run configured to fail at step 5 of 10 still reaches 10.
pub struct ScriptedJob {
    cycle: u64,
    stop_at: Option<u64>,
    fail_steps: Vec<u64>,
    fail_back_steps: Vec<u64>,
    stats: Arc<JobStats>,
}

impl ScriptedJob {
    /// A job that runs forever (no stop condition).
    pub fn endless() -> Self {
        Self::new(None)
    }

    /// A job whose stop condition holds at `stop_at`.
    pub fn until(stop_at: u64) -> Self {
        Self::new(Some(stop_at))
    }

    fn new(stop_at: Option<u64>) -> Self {
        Self {
            cycle: 0,
            stop_at,
            fail_steps: Vec::new(),
            fail_back_steps: Vec::new(),
            stats: Arc::new(JobStats::default()),
        }
    }

    /// Make the forward steps reaching these cycles fail.
    pub fn failing_at(mut self, cycles: impl IntoIterator<Item = u64>) -> Self {
        self.fail_steps = cycles.into_iter().collect();
        self
    }

    /// Make back-steps attempted at these cycles fail.
    pub fn failing_back_at(mut self, cycles: impl IntoIterator<Item = u64>) -> Self {
        self.fail_back_steps = cycles.into_iter().collect();
        self
    }

    /// The stats handle tests observe.
    pub fn stats(&self) -> Arc<JobStats> {
        Arc::clone(&self.stats)
    }
}

impl SimulationJob for ScriptedJob {
    fn do_step(&mut self) -> Result<CycleId, StepError> {
        self.cycle += 1;
        self.stats.steps.fetch_add(1, Ordering::AcqRel);
        if self.fail_steps.contains(&self.cycle) {
            return Err(StepError::ExecutionFailed {
                reason: format!("scripted failure at cycle {}", self.cycle),
            });
        }
        Ok(CycleId(self.cycle))
    }

    fn do_back_step(&mut self) -> Result<CycleId, StepError> {
        if self.cycle == 0 {
            return Err(StepError::NoHistory);
        }
        if self.fail_back_steps.contains(&self.cycle) {
            return Err(StepError::ExecutionFailed {
                reason: format!("scripted back-step failure at cycle {}", self.cycle),
            });
        }
        self.cycle -= 1;
        self.stats.back_steps.fetch_add(1, Ordering::AcqRel);
        Ok(CycleId(self.cycle))
    }

    fn cycle(&self) -> CycleId {
        CycleId(self.cycle)
    }

    fn stop_condition_met(&self) -> bool {
        self.stop_at.is_some_and(|stop| self.cycle >= stop)
    }

    fn is_interrupted(&self) -> bool {
        self.stats.interrupted.load(Ordering::Acquire)
    }

    fn dispose(&mut self) {
        self.stats.disposals.fetch_add(1, Ordering::AcqRel);
    }
}

// ── ScriptedFactory ──────────────────────────────────────────────

/// A [`JobFactory`] producing [`ScriptedJob`]s.
///
/// Reads the optional integer parameter `stop_at` as the stop-condition
/// threshold. Every built job's [`JobStats`] handle is retained so
/// tests can assert on jobs the controller built internally (OPEN,
/// RELOAD).
pub struct ScriptedFactory {
    fail_steps: Vec<u64>,
    fail_back_steps: Vec<u64>,
    fail_builds: AtomicU64,
    builds: AtomicU64,
    jobs: Mutex<Vec<Arc<JobStats>>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self {
            fail_steps: Vec::new(),
            fail_back_steps: Vec::new(),
            fail_builds: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            jobs: Mutex::new(Vec::new()),
        }
    }

    /// Make every built job fail its forward step at these cycles.
    pub fn failing_at(mut self, cycles: impl IntoIterator<Item = u64>) -> Self {
        self.fail_steps = cycles.into_iter().collect();
        self
    }

    /// Make every built job fail back-steps at these cycles.
    pub fn failing_back_at(mut self, cycles: impl IntoIterator<Item = u64>) -> Self {
        self.fail_back_steps = cycles.into_iter().collect();
        self
    }

    /// Make the next `count` builds fail.
    pub fn failing_builds(self, count: u64) -> Self {
        self.fail_builds.store(count, Ordering::Release);
        self
    }

    /// Make the next `count` builds fail, settable mid-test (e.g. to
    /// let OPEN succeed and a later RELOAD fail).
    pub fn fail_next_builds(&self, count: u64) {
        self.fail_builds.store(count, Ordering::Release);
    }

    /// How many jobs were built so far.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Acquire)
    }

    /// Stats handles of every job built, in build order.
    pub fn jobs(&self) -> Vec<Arc<JobStats>> {
        self.jobs.lock().unwrap().clone()
    }
}

impl Default for ScriptedFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl JobFactory for ScriptedFactory {
    fn build(&self, params: &ExperimentParams) -> Result<Box<dyn SimulationJob>, LoadError> {
        let remaining = self.fail_builds.load(Ordering::Acquire);
        if remaining > 0 {
            self.fail_builds.store(remaining - 1, Ordering::Release);
            return Err(LoadError::BuildFailed {
                reason: "scripted build failure".into(),
            });
        }
        let stop_at = match params.get("stop_at") {
            None => None,
            Some(ParamValue::Int(n)) if *n >= 0 => Some(*n as u64),
            Some(other) => {
                return Err(LoadError::InvalidParameter {
                    name: "stop_at".into(),
                    reason: format!("expected a non-negative integer, got {other}"),
                })
            }
        };
        let job = match stop_at {
            Some(stop) => ScriptedJob::until(stop),
            None => ScriptedJob::endless(),
        }
        .failing_at(self.fail_steps.iter().copied())
        .failing_back_at(self.fail_back_steps.iter().copied());
        self.builds.fetch_add(1, Ordering::AcqRel);
        self.jobs.lock().unwrap().push(job.stats());
        Ok(Box::new(job))
    }
}

// ── RecordingReporter ────────────────────────────────────────────

/// One record captured by [`RecordingReporter`].
#[derive(Clone, Debug, PartialEq)]
pub enum Recorded {
    Error(ExperimentId, ControlError),
    Event(ExperimentId, ExperimentEvent),
}

/// A [`StatusReporter`] that records everything for later assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    records: Mutex<Vec<Recorded>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in arrival order.
    pub fn records(&self) -> Vec<Recorded> {
        self.records.lock().unwrap().clone()
    }

    /// Only the reported errors, in arrival order.
    pub fn errors(&self) -> Vec<ControlError> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Error(_, e) => Some(e),
                _ => None,
            })
            .collect()
    }

    /// Only the events, in arrival order.
    pub fn events(&self) -> Vec<ExperimentEvent> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Recorded::Event(_, e) => Some(e),
                _ => None,
            })
            .collect()
    }
}

impl StatusReporter for RecordingReporter {
    fn report_error(&self, experiment: ExperimentId, error: &ControlError) {
        self.records
            .lock()
            .unwrap()
            .push(Recorded::Error(experiment, error.clone()));
    }

    fn notify(&self, experiment: ExperimentId, event: ExperimentEvent) {
        self.records
            .lock()
            .unwrap()
            .push(Recorded::Event(experiment, event));
    }
}

// ── RecordingTransport ───────────────────────────────────────────

/// A [`Transport`] that records sent messages.
///
/// Call [`disconnect`](RecordingTransport::disconnect) to make further
/// sends fail with [`TransportError::Closed`].
#[derive(Debug, Default)]
pub struct RecordingTransport {
    messages: Mutex<Vec<StatusMessage>>,
    closed: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, in send order.
    pub fn messages(&self) -> Vec<StatusMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Simulate the peer going away.
    pub fn disconnect(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl Transport for RecordingTransport {
    fn send(&self, message: StatusMessage) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}
