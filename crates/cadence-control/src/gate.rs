//! Pause admission and completion signalling primitives.
//!
//! [`PauseGate`] is the single-permit gate the run loop blocks on while
//! paused. [`PauseFlag`] is the shared paused/running flag with a
//! condition variable for synchronous callers. [`StepMonitor`] counts
//! completed steps so synchronous stepping can wait for its step to
//! finish instead of spinning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

// ── GateClosed ───────────────────────────────────────────────────

/// The gate was closed while a thread was blocked acquiring it.
///
/// This is the controlled interruption path: a run loop observing it
/// must terminate rather than retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateClosed;

impl std::fmt::Display for GateClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pause gate closed")
    }
}

impl std::error::Error for GateClosed {}

// ── PauseGate ────────────────────────────────────────────────────

struct GateState {
    /// 0 or 1. A binary semaphore, not a counting one: queued releases
    /// without intervening acquisitions do not stack up.
    permits: u8,
    closed: bool,
}

/// Single-permit blocking gate controlling step admission.
///
/// The run loop calls [`acquire`](PauseGate::acquire) before each step
/// while paused. One [`release`](PauseGate::release) admits exactly one
/// blocked acquisition; releasing an already-available gate is a no-op.
/// [`close`](PauseGate::close) wakes every waiter with [`GateClosed`]
/// and fails all future acquisitions — it is the teardown analog of
/// thread interruption.
///
/// A fresh gate starts with zero permits, so a paused run loop blocks
/// immediately.
pub struct PauseGate {
    state: Mutex<GateState>,
    cond: Condvar,
}

impl PauseGate {
    /// Create a gate with no permit available.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                permits: 0,
                closed: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Block until a permit is available, then consume it.
    pub fn acquire(&self) -> Result<(), GateClosed> {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.closed {
                return Err(GateClosed);
            }
            if state.permits > 0 {
                state.permits -= 1;
                return Ok(());
            }
            state = self.cond.wait(state).unwrap();
        }
    }

    /// Make one permit available, capping at one.
    pub fn release(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.closed {
            state.permits = 1;
        }
        drop(state);
        self.cond.notify_one();
    }

    /// Close the gate: wake all waiters, fail all future acquisitions.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        drop(state);
        self.cond.notify_all();
    }

    /// Whether a permit is currently available. Test instrumentation.
    #[cfg(test)]
    pub(crate) fn has_permit(&self) -> bool {
        self.state.lock().unwrap().permits > 0
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

// ── PauseFlag ────────────────────────────────────────────────────

/// The shared paused/running flag.
///
/// Reads are lock-free; [`wait_until_paused`](PauseFlag::wait_until_paused)
/// parks on a condition variable instead of busy-waiting.
pub struct PauseFlag {
    paused: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl PauseFlag {
    /// Create the flag. Experiments start paused.
    pub fn new(initially_paused: bool) -> Self {
        Self {
            paused: AtomicBool::new(initially_paused),
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Current value.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Set the flag, waking any thread waiting for a pause.
    pub fn set(&self, paused: bool) {
        let guard = self.lock.lock().unwrap();
        self.paused.store(paused, Ordering::Release);
        drop(guard);
        if paused {
            self.cond.notify_all();
        }
    }

    /// Block until the flag reads paused or the timeout elapses.
    ///
    /// Returns `true` if the pause was observed.
    pub fn wait_until_paused(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.lock.lock().unwrap();
        while !self.paused.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (g, result) = self.cond.wait_timeout(guard, deadline - now).unwrap();
            guard = g;
            if result.timed_out() && !self.paused.load(Ordering::Acquire) {
                return false;
            }
        }
        true
    }
}

// ── StepMonitor ──────────────────────────────────────────────────

/// Counts completed steps and lets callers wait for a target count.
///
/// The run loop calls [`completed`](StepMonitor::completed) after every
/// executed step (successful or failed — either way the admission was
/// consumed). A synchronous `step()` records the count before admitting
/// the step and waits for it to advance.
pub struct StepMonitor {
    count: Mutex<u64>,
    cond: Condvar,
}

impl StepMonitor {
    /// Create a monitor at count zero.
    pub fn new() -> Self {
        Self {
            count: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    /// Steps completed so far.
    pub fn count(&self) -> u64 {
        *self.count.lock().unwrap()
    }

    /// Record one completed step.
    pub fn completed(&self) {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        drop(count);
        self.cond.notify_all();
    }

    /// Block until the count reaches `target` or the timeout elapses.
    ///
    /// Returns `true` if the target was reached.
    pub fn wait_for(&self, target: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock().unwrap();
        while *count < target {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (g, result) = self.cond.wait_timeout(count, deadline - now).unwrap();
            count = g;
            if result.timed_out() && *count < target {
                return false;
            }
        }
        true
    }
}

impl Default for StepMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquire_blocks_until_release() {
        let gate = Arc::new(PauseGate::new());
        let g = Arc::clone(&gate);
        let handle = thread::spawn(move || g.acquire());
        // Give the thread time to park.
        thread::sleep(Duration::from_millis(50));
        assert!(!handle.is_finished(), "acquire should block with no permit");
        gate.release();
        assert_eq!(handle.join().unwrap(), Ok(()));
    }

    #[test]
    fn release_does_not_stack_permits() {
        let gate = PauseGate::new();
        gate.release();
        gate.release();
        gate.release();
        assert_eq!(gate.acquire(), Ok(()));
        // Only one permit existed despite three releases.
        assert!(!gate.has_permit());
    }

    #[test]
    fn close_unblocks_waiter_with_error() {
        let gate = Arc::new(PauseGate::new());
        let g = Arc::clone(&gate);
        let handle = thread::spawn(move || g.acquire());
        thread::sleep(Duration::from_millis(50));
        gate.close();
        assert_eq!(handle.join().unwrap(), Err(GateClosed));
        // Closed stays closed.
        assert_eq!(gate.acquire(), Err(GateClosed));
    }

    #[test]
    fn release_after_close_is_inert() {
        let gate = PauseGate::new();
        gate.close();
        gate.release();
        assert_eq!(gate.acquire(), Err(GateClosed));
    }

    #[test]
    fn pause_flag_wait_observes_pause() {
        let flag = Arc::new(PauseFlag::new(false));
        let f = Arc::clone(&flag);
        let handle = thread::spawn(move || f.wait_until_paused(Duration::from_secs(2)));
        thread::sleep(Duration::from_millis(50));
        flag.set(true);
        assert!(handle.join().unwrap());
    }

    #[test]
    fn pause_flag_wait_times_out() {
        let flag = PauseFlag::new(false);
        assert!(!flag.wait_until_paused(Duration::from_millis(50)));
    }

    #[test]
    fn step_monitor_wait_for_target() {
        let monitor = Arc::new(StepMonitor::new());
        let m = Arc::clone(&monitor);
        let handle = thread::spawn(move || m.wait_for(3, Duration::from_secs(2)));
        for _ in 0..3 {
            thread::sleep(Duration::from_millis(10));
            monitor.completed();
        }
        assert!(handle.join().unwrap());
        assert_eq!(monitor.count(), 3);
    }
}
