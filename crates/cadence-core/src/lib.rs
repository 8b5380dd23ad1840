//! Core types and traits for the Cadence experiment controller.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the symbolic command set, experiment identifiers and parameters,
//! error types, status messages, and the collaborator traits the
//! controller consumes.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod command;
pub mod error;
pub mod id;
pub mod message;
pub mod params;
pub mod traits;

pub use command::Command;
pub use error::{ControlError, LoadError, StepError, TransportError};
pub use id::{CycleId, ExperimentId};
pub use message::{ExperimentEvent, StatusBody, StatusMessage};
pub use params::{ExperimentParams, ParamValue};
pub use traits::{JobFactory, SimulationJob, StatusReporter, Transport};
