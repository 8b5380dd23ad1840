//! Experiment execution controller: a stepped, pausable, resumable
//! simulation loop exposed through a uniform command surface.
//!
//! # Architecture
//!
//! ```text
//! Caller Thread(s)            Command Thread             Run Loop Thread
//!     |                            |                          |
//!     |--user_step()-------------->| rx.recv()                |
//!     |   [mailbox: bounded(10)]   | process(Step)            |
//!     |   never blocks             |   paused = true          |
//!     |                            |   gate.release() ------->| gate.acquire()
//!     |                            |                          | job.do_step()
//!     |                            |                          | steps.completed()
//!     |--step(1, sync)             |                          | (re-parks on gate)
//!     |   waits on StepMonitor<----------------------------- -|
//!     |                            |                          |
//!     |--user_reload()------------>| retire old lease         |
//!     |                            | rebuild job              |
//!     |                            | fresh gate/mailbox/threads
//! ```
//!
//! Exactly one command processor thread and at most one run loop thread
//! are live per controller. Callers only ever enqueue; the processor is
//! the sole mutator of controller state; the run loop executes steps.
//! The job slot's mutex backs the invariant that the processor touches
//! the job only while the run loop is parked.
//!
//! Outcomes surface asynchronously through the
//! [`StatusReporter`](cadence_core::StatusReporter) collaborator — pair
//! the controller with a [`TransportReporter`] to push them to a remote
//! peer. Nothing is ever thrown back through the enqueue path.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod gate;
pub mod mailbox;
mod processor;
mod run_loop;
pub mod transport;

pub use config::{ConfigError, ControllerConfig};
pub use controller::ExperimentController;
pub use gate::{GateClosed, PauseFlag, PauseGate, StepMonitor};
pub use mailbox::{Mailbox, DEFAULT_COMMAND_CAPACITY};
pub use transport::TransportReporter;
