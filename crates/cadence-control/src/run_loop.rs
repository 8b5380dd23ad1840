//! The dedicated execution thread driving a simulation job.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use cadence_core::{ControlError, CycleId, ExperimentEvent};

use crate::controller::Inner;
use crate::gate::PauseGate;

/// Outcome of the pre-step check, taken under the job lock.
enum Check {
    Step,
    Ended(CycleId),
    Halt,
}

/// The run loop: executes one step per iteration while admitted.
///
/// Separating "block until admitted" (the gate) from "execute one step"
/// lets STEP and START share identical step execution and differ only
/// in admission cadence. The loop holds the job lock only inside the
/// check and the step itself, never across the gate — the command
/// processor mutates the job exclusively while the loop is parked.
pub(crate) struct RunLoop {
    pub inner: Arc<Inner>,
    /// This lease's gate. Reload closes it to evict the loop.
    pub gate: Arc<PauseGate>,
}

impl RunLoop {
    /// Run until the stop condition holds, the job is interrupted, the
    /// controller dies, or the gate is closed.
    pub fn run(self) {
        let notify_end = self.inner.params.has_stop_condition();
        loop {
            if !self.inner.alive.load(Ordering::Acquire) {
                break;
            }

            let check = {
                let slot = self.inner.job.lock().unwrap();
                match slot.as_ref() {
                    None => Check::Halt,
                    Some(job) if job.is_interrupted() => Check::Halt,
                    Some(job) if job.stop_condition_met() => Check::Ended(job.cycle()),
                    Some(_) => Check::Step,
                }
            };
            match check {
                Check::Halt => break,
                Check::Ended(cycle) => {
                    // Clear `alive` before announcing, so a STEP racing
                    // the notification cannot respawn the loop and see
                    // the stop condition a second time.
                    self.inner.alive.store(false, Ordering::Release);
                    tracing::debug!(experiment = %self.inner.id, cycle = cycle.0, "stop condition met");
                    if notify_end {
                        self.inner
                            .reporter
                            .notify(self.inner.id, ExperimentEvent::SimulationEnded { cycle });
                    }
                    break;
                }
                Check::Step => {}
            }

            // Admission: while paused, each iteration waits for exactly
            // one gate permit. A closed gate is the interruption path.
            if self.inner.paused.is_paused() && self.gate.acquire().is_err() {
                break;
            }

            let result = {
                let mut slot = self.inner.job.lock().unwrap();
                slot.as_mut().map(|job| (job.cycle(), job.do_step()))
            };
            match result {
                None => break,
                Some((cycle, Err(e))) => {
                    // A single failed step never terminates the run.
                    tracing::warn!(
                        experiment = %self.inner.id,
                        cycle = cycle.0,
                        error = %e,
                        "step failed, run continues"
                    );
                    self.inner
                        .reporter
                        .report_error(self.inner.id, &ControlError::Step(e));
                    self.inner.steps.completed();
                }
                Some((_, Ok(_))) => self.inner.steps.completed(),
            }
        }
        // Every exit is terminal for this job: a run loop only comes
        // back with a rebuilt job (OPEN or RELOAD resets `alive`).
        self.inner.alive.store(false, Ordering::Release);
    }
}
