//! Cadence: stepped, pausable, reloadable experiment execution.
//!
//! This is the top-level facade crate that re-exports the public API
//! from the Cadence sub-crates. For most users, adding `cadence` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cadence::prelude::*;
//! use std::sync::Arc;
//!
//! // A minimal job that just counts cycles.
//! struct Counter {
//!     cycle: u64,
//! }
//! impl SimulationJob for Counter {
//!     fn do_step(&mut self) -> Result<CycleId, StepError> {
//!         self.cycle += 1;
//!         Ok(CycleId(self.cycle))
//!     }
//!     fn do_back_step(&mut self) -> Result<CycleId, StepError> {
//!         if self.cycle == 0 {
//!             return Err(StepError::NoHistory);
//!         }
//!         self.cycle -= 1;
//!         Ok(CycleId(self.cycle))
//!     }
//!     fn cycle(&self) -> CycleId {
//!         CycleId(self.cycle)
//!     }
//!     fn stop_condition_met(&self) -> bool {
//!         false
//!     }
//!     fn is_interrupted(&self) -> bool {
//!         false
//!     }
//!     fn dispose(&mut self) {}
//! }
//!
//! struct CounterFactory;
//! impl JobFactory for CounterFactory {
//!     fn build(&self, _: &ExperimentParams) -> Result<Box<dyn SimulationJob>, LoadError> {
//!         Ok(Box::new(Counter { cycle: 0 }))
//!     }
//! }
//!
//! struct Silent;
//! impl StatusReporter for Silent {
//!     fn report_error(&self, _: ExperimentId, _: &ControlError) {}
//!     fn notify(&self, _: ExperimentId, _: ExperimentEvent) {}
//! }
//!
//! let controller = ExperimentController::new(
//!     ExperimentId::next(),
//!     ExperimentParams::new(),
//!     Arc::new(CounterFactory),
//!     Arc::new(Silent),
//!     ControllerConfig::default(),
//! )
//! .unwrap();
//!
//! controller.direct_open().unwrap();
//! controller.step(3, true).unwrap(); // synchronous: waits per step
//! assert_eq!(controller.step_count(), 3);
//! assert!(controller.is_paused());
//! controller.dispose();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cadence-core` | IDs, commands, parameters, errors, collaborator traits |
//! | [`control`] | `cadence-control` | The controller, pause gate, mailbox, transport adapter |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`cadence-core`).
pub use cadence_core as types;

/// The experiment controller and its primitives (`cadence-control`).
pub use cadence_control as control;

/// Common imports for typical Cadence usage.
///
/// ```rust
/// use cadence::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use cadence_core::{
        Command, CycleId, ExperimentEvent, ExperimentId, ExperimentParams, JobFactory, ParamValue,
        SimulationJob, StatusBody, StatusMessage, StatusReporter, Transport,
    };

    // Errors
    pub use cadence_core::{ControlError, LoadError, StepError, TransportError};

    // Controller
    pub use cadence_control::{ControllerConfig, ExperimentController, TransportReporter};
}
