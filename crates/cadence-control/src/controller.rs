//! The per-experiment controller façade and its dispatch core.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cadence_core::{
    Command, ControlError, ExperimentEvent, ExperimentId, ExperimentParams, JobFactory,
    SimulationJob, StatusReporter,
};

use crate::config::{ConfigError, ControllerConfig};
use crate::gate::{PauseFlag, StepMonitor};
use crate::processor::WorkerLease;
use crate::run_loop::RunLoop;

/// How long a synchronous call waits for its effect before concluding
/// the controller was torn down under it.
const SYNC_WAIT: Duration = Duration::from_secs(60);

/// Interval at which a synchronous wait re-checks the controller's
/// liveness, so an ended or disposing run is noticed promptly rather
/// than after the full [`SYNC_WAIT`].
const SYNC_POLL: Duration = Duration::from_millis(50);

// ── Inner ────────────────────────────────────────────────────────

/// Shared controller state: flags, job slot, and the worker lease.
///
/// Every thread of interest holds an `Arc<Inner>`: the façade, the
/// command processor, and the run loop. Lock ordering is lease before
/// job; no path holds both while blocking on anything else.
pub(crate) struct Inner {
    pub id: ExperimentId,
    pub params: ExperimentParams,
    pub factory: Arc<dyn JobFactory>,
    pub reporter: Arc<dyn StatusReporter>,
    pub config: ControllerConfig,
    /// True while a run may execute. Cleared when the run loop exits
    /// (end, halt, eviction); reset by OPEN and RELOAD. STEP and START
    /// are refused while false.
    pub alive: AtomicBool,
    /// True when stepping should block. Experiments start paused.
    pub paused: PauseFlag,
    /// True once teardown has begun; closes the mailbox boundary.
    pub disposing: AtomicBool,
    /// Makes `dispose()` idempotent.
    pub disposed: AtomicBool,
    /// The current job. The run loop locks it per step; the processor
    /// locks it only while the run loop is guaranteed parked.
    pub job: Mutex<Option<Box<dyn SimulationJob>>>,
    /// Completion counter for synchronous stepping.
    pub steps: StepMonitor,
    /// The current worker generation, swapped wholesale on reload.
    pub lease: Mutex<WorkerLease>,
}

impl Inner {
    /// Enqueue a command without blocking.
    ///
    /// Silently drops the command when disposing, when no job is loaded
    /// (OPEN excepted), or when the mailbox is full. Errors never reach
    /// the caller through this path.
    pub fn offer(&self, command: Command) {
        if self.disposing.load(Ordering::Acquire) {
            tracing::debug!(experiment = %self.id, ?command, "command dropped: disposing");
            return;
        }
        if command != Command::Open {
            let loaded = self.job.lock().unwrap().is_some();
            if !loaded {
                tracing::debug!(experiment = %self.id, ?command, "command dropped: no job");
                return;
            }
        }
        let lease = self.lease.lock().unwrap();
        if let Some(mailbox) = &lease.mailbox {
            mailbox.offer(command);
        }
    }

    /// Dispatch one command. This is the single dispatch boundary: any
    /// failure is reported through the status reporter here, then
    /// returned for direct (synchronous) callers.
    pub fn process(self: &Arc<Self>, command: Command) -> Result<(), ControlError> {
        let result = match command {
            Command::Open => self.handle_open(),
            Command::Start => self.handle_start(),
            Command::Step => self.handle_step(),
            Command::Pause => {
                self.paused.set(true);
                Ok(())
            }
            Command::StepBack => self.handle_step_back(),
            Command::Reload => self.handle_reload(),
            Command::Close => {
                self.close_experiment();
                Ok(())
            }
            Command::Shutdown => Ok(()),
        };
        if let Err(e) = &result {
            tracing::debug!(experiment = %self.id, ?command, error = %e, "command failed");
            self.reporter.report_error(self.id, e);
        }
        result
    }

    fn require_job(&self) -> Result<(), ControlError> {
        if self.job.lock().unwrap().is_some() {
            Ok(())
        } else {
            Err(ControlError::NoJob)
        }
    }

    /// STEP and START are only legal while the run may still execute;
    /// once the run loop has exited the end is terminal for this job.
    fn require_alive(&self) -> Result<(), ControlError> {
        if self.alive.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ControlError::Ended)
        }
    }

    /// OPEN: build the job from the stored parameters.
    ///
    /// On failure the controller stays paused and available for a
    /// retry; `alive` is not touched.
    fn handle_open(&self) -> Result<(), ControlError> {
        if self.disposing.load(Ordering::Acquire) {
            return Err(ControlError::Disposing);
        }
        let job = self.factory.build(&self.params).map_err(ControlError::Load)?;
        let mut slot = self.job.lock().unwrap();
        if let Some(mut old) = slot.take() {
            old.dispose();
        }
        *slot = Some(job);
        drop(slot);
        self.alive.store(true, Ordering::Release);
        Ok(())
    }

    /// START: leave the paused state and admit the run loop, launching
    /// it if this is the first admission.
    fn handle_start(self: &Arc<Self>) -> Result<(), ControlError> {
        self.require_job()?;
        self.require_alive()?;
        self.paused.set(false);
        let mut lease = self.lease.lock().unwrap();
        self.ensure_run_loop(&mut lease);
        lease.gate.release();
        Ok(())
    }

    /// STEP: pause, then admit exactly one step.
    fn handle_step(self: &Arc<Self>) -> Result<(), ControlError> {
        self.require_job()?;
        self.require_alive()?;
        self.paused.set(true);
        let mut lease = self.lease.lock().unwrap();
        self.ensure_run_loop(&mut lease);
        lease.gate.release();
        Ok(())
    }

    /// STEP_BACK: pause, then undo one step.
    ///
    /// Locking the job slot is the completion barrier: a step still in
    /// flight holds the lock, so the back-step starts only after it
    /// finishes and the run loop has parked on the gate.
    fn handle_step_back(&self) -> Result<(), ControlError> {
        self.paused.set(true);
        let mut slot = self.job.lock().unwrap();
        let job = slot.as_mut().ok_or(ControlError::NoJob)?;
        job.do_back_step().map_err(ControlError::Step)?;
        Ok(())
    }

    /// RELOAD: retire the old lease, rebuild the job from the same
    /// parameters, install a fresh lease with a parked run loop.
    ///
    /// Requires the controller to already be paused; the processor does
    /// not auto-pause.
    fn handle_reload(self: &Arc<Self>) -> Result<(), ControlError> {
        if self.disposed.load(Ordering::Acquire) || self.disposing.load(Ordering::Acquire) {
            return Err(ControlError::Disposing);
        }
        if !self.paused.is_paused() {
            return Err(ControlError::NotPaused);
        }
        self.require_job()?;

        let mut lease = self.lease.lock().unwrap();

        // Retire the old workers. The old processor may be the thread
        // running this very dispatch: it is never joined from itself,
        // it simply observes `accepting == false` and returns.
        lease.accepting.store(false, Ordering::Release);
        if let Some(mailbox) = &lease.mailbox {
            mailbox.offer(Command::Shutdown);
        }
        lease.mailbox = None;
        lease.gate.close();
        if let Some(handle) = lease.run_loop.take() {
            let _ = handle.join();
        }
        if let Some(handle) = lease.processor.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }

        // Old job out, new job in, from exactly the stored parameters.
        {
            let mut slot = self.job.lock().unwrap();
            if let Some(mut old) = slot.take() {
                old.dispose();
            }
        }
        let job = match self.factory.build(&self.params) {
            Ok(job) => job,
            Err(e) => {
                // Rebuild failure is fatal to the session; the error
                // itself is reported at the dispatch boundary.
                drop(lease);
                self.close_experiment();
                return Err(ControlError::Load(e));
            }
        };
        *self.job.lock().unwrap() = Some(job);

        // Fresh lease: new gate, new mailbox, new threads.
        *lease = WorkerLease::start(self);
        self.alive.store(true, Ordering::Release);
        self.paused.set(true);
        self.disposing.store(false, Ordering::Release);
        // Relaunch execution; the loop parks on the fresh gate.
        self.ensure_run_loop(&mut lease);
        drop(lease);

        self.reporter.notify(self.id, ExperimentEvent::Reloaded);
        Ok(())
    }

    /// Launch the run loop on a fresh thread unless this lease already
    /// has a live one.
    pub(crate) fn ensure_run_loop(self: &Arc<Self>, lease: &mut WorkerLease) {
        if !self.alive.load(Ordering::Acquire) || lease.run_loop_live() {
            return;
        }
        let run = RunLoop {
            inner: Arc::clone(self),
            gate: Arc::clone(&lease.gate),
        };
        lease.run_loop = Some(
            thread::Builder::new()
                .name(format!("{}-run", self.config.thread_name))
                .spawn(move || run.run())
                .expect("failed to spawn run loop thread"),
        );
    }

    /// CLOSE: mark disposing, then tear down.
    pub fn close_experiment(self: &Arc<Self>) {
        self.disposing.store(true, Ordering::Release);
        self.dispose();
    }

    /// Tear down both threads and the job. Idempotent: repeated calls
    /// after the first are no-ops.
    pub fn dispose(self: &Arc<Self>) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.disposing.store(true, Ordering::Release);
        self.paused.set(true);
        self.alive.store(false, Ordering::Release);

        let (gate, processor, run_loop) = {
            let mut lease = self.lease.lock().unwrap();
            lease.accepting.store(false, Ordering::Release);
            if let Some(mailbox) = &lease.mailbox {
                // Sentinel first; dropping the mailbox below disconnects
                // the channel in case the sentinel found the queue full.
                mailbox.offer(Command::Shutdown);
            }
            lease.mailbox = None;
            (
                Arc::clone(&lease.gate),
                lease.processor.take(),
                lease.run_loop.take(),
            )
        };
        gate.close();

        // Either thread may itself be the disposer (CLOSE arrives on
        // the processor); a thread is never joined from itself.
        let current = thread::current().id();
        if let Some(handle) = run_loop {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }
        if let Some(handle) = processor {
            if handle.thread().id() != current {
                let _ = handle.join();
            }
        }

        if let Some(mut job) = self.job.lock().unwrap().take() {
            job.dispose();
        }
        self.reporter.notify(self.id, ExperimentEvent::Disposed);
    }
}

// ── ExperimentController ─────────────────────────────────────────

/// The per-experiment state holder exposed to external callers.
///
/// Offers every operation in two flavors: `user_*` methods enqueue a
/// symbolic command and return immediately (safe from any thread, never
/// block, never error), while `direct_*` methods dispatch inline on the
/// calling thread and return the outcome — used by deterministic
/// startup sequences and synchronous protocol handlers.
///
/// The controller starts paused with a live command processor; the run
/// loop thread is launched by the first START or STEP. Dropping the
/// controller disposes it.
pub struct ExperimentController {
    inner: Arc<Inner>,
}

impl ExperimentController {
    /// Create a controller for one experiment session.
    ///
    /// The command processor thread starts immediately, paused. No job
    /// is loaded until OPEN.
    pub fn new(
        id: ExperimentId,
        params: ExperimentParams,
        factory: Arc<dyn JobFactory>,
        reporter: Arc<dyn StatusReporter>,
        config: ControllerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let inner = Arc::new(Inner {
            id,
            params,
            factory,
            reporter,
            config,
            alive: AtomicBool::new(true),
            paused: PauseFlag::new(true),
            disposing: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            job: Mutex::new(None),
            steps: StepMonitor::new(),
            lease: Mutex::new(WorkerLease::idle()),
        });
        // The lease needs the Arc to hand its processor thread.
        *inner.lease.lock().unwrap() = WorkerLease::start(&inner);
        Ok(Self { inner })
    }

    /// This controller's experiment ID.
    pub fn id(&self) -> ExperimentId {
        self.inner.id
    }

    /// The stored parameters OPEN and RELOAD build jobs from.
    pub fn params(&self) -> &ExperimentParams {
        &self.inner.params
    }

    /// Whether the controller is paused.
    pub fn is_paused(&self) -> bool {
        self.inner.paused.is_paused()
    }

    /// Whether teardown has begun.
    pub fn is_disposing(&self) -> bool {
        self.inner.disposing.load(Ordering::Acquire)
    }

    /// Total steps executed so far (including failed ones).
    pub fn step_count(&self) -> u64 {
        self.inner.steps.count()
    }

    // ── queued (asynchronous) command surface ────────────────────

    /// Enqueue OPEN.
    pub fn user_open(&self) {
        self.inner.offer(Command::Open);
    }

    /// Enqueue START.
    pub fn user_start(&self) {
        self.inner.offer(Command::Start);
    }

    /// Enqueue PAUSE.
    pub fn user_pause(&self) {
        self.inner.offer(Command::Pause);
    }

    /// Enqueue STEP.
    pub fn user_step(&self) {
        self.inner.offer(Command::Step);
    }

    /// Enqueue STEP_BACK.
    pub fn user_step_back(&self) {
        self.inner.offer(Command::StepBack);
    }

    /// Enqueue RELOAD.
    pub fn user_reload(&self) {
        self.inner.offer(Command::Reload);
    }

    /// Enqueue CLOSE.
    pub fn user_close(&self) {
        self.inner.offer(Command::Close);
    }

    /// START if paused, PAUSE otherwise.
    pub fn start_pause(&self) {
        if self.is_paused() {
            self.user_start();
        } else {
            self.user_pause();
        }
    }

    // ── direct (synchronous) command surface ─────────────────────

    /// Dispatch OPEN inline.
    pub fn direct_open(&self) -> Result<(), ControlError> {
        self.inner.process(Command::Open)
    }

    /// Dispatch PAUSE inline.
    pub fn direct_pause(&self) -> Result<(), ControlError> {
        self.inner.process(Command::Pause)
    }

    /// Dispatch STEP inline: admits one step without waiting for it.
    pub fn direct_step(&self) -> Result<(), ControlError> {
        self.inner.process(Command::Step)
    }

    /// Dispatch RELOAD inline. Requires the controller to be paused.
    pub fn direct_reload(&self) -> Result<(), ControlError> {
        self.inner.process(Command::Reload)
    }

    /// Step `count` times.
    ///
    /// Asynchronous mode enqueues `count` STEP commands and returns.
    /// Synchronous mode admits the steps one at a time, waiting for
    /// each to complete before admitting the next; the wait fails if
    /// the run ends or the controller is torn down mid-step.
    pub fn step(&self, count: usize, synchronous: bool) -> Result<(), ControlError> {
        if synchronous {
            for _ in 0..count {
                let target = self.inner.steps.count() + 1;
                self.inner.process(Command::Step)?;
                let deadline = Instant::now() + SYNC_WAIT;
                while !self.inner.steps.wait_for(target, SYNC_POLL) {
                    if self.inner.disposing.load(Ordering::Acquire) {
                        return Err(ControlError::Disposing);
                    }
                    // The admitted step never ran: the loop found the
                    // stop condition already met and exited instead.
                    if !self.inner.alive.load(Ordering::Acquire) {
                        return Err(ControlError::Ended);
                    }
                    if Instant::now() >= deadline {
                        return Err(ControlError::Disposing);
                    }
                }
            }
        } else {
            for _ in 0..count {
                self.inner.offer(Command::Step);
            }
        }
        Ok(())
    }

    /// Step back `count` times.
    ///
    /// Pauses first. Asynchronous mode enqueues one STEP_BACK per
    /// requested step; each is dispatched independently. Synchronous
    /// mode waits for the pause (failing with `Disposing` if it never
    /// arrives), then drives the back-steps inline — the first failure
    /// aborts the rest of the batch and is announced through the
    /// reporter.
    pub fn step_back(&self, count: usize, synchronous: bool) -> Result<(), ControlError> {
        self.inner.paused.set(true);
        if synchronous {
            // A concurrent START can clear the flag between the set
            // above and this wait; a pause that never lands means the
            // controller is being driven down or away from under us.
            if !self.inner.paused.wait_until_paused(SYNC_WAIT) {
                return Err(ControlError::Disposing);
            }
            for done in 0..count {
                if let Err(e) = self.inner.process(Command::StepBack) {
                    self.inner.reporter.notify(
                        self.inner.id,
                        ExperimentEvent::BackStepAborted {
                            remaining: count - done - 1,
                            reason: e.to_string(),
                        },
                    );
                    return Err(e);
                }
            }
        } else {
            for _ in 0..count {
                self.inner.offer(Command::StepBack);
            }
        }
        Ok(())
    }

    /// Begin teardown immediately (the direct form of CLOSE).
    pub fn close(&self) {
        self.inner.close_experiment();
    }

    /// Tear down both threads and the job. Idempotent.
    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

impl Drop for ExperimentController {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}
