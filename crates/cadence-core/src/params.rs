//! Opaque experiment parameters used to build and rebuild jobs.

use indexmap::IndexMap;
use std::fmt;

/// A single parameter value.
///
/// Parameters are an opaque structured payload from the controller's
/// point of view: only the [`JobFactory`](crate::JobFactory) interprets
/// them.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A text value.
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

/// The parameter set for one experiment, in declaration order.
///
/// Held by the controller for the whole session so that RELOAD can
/// rebuild the job from exactly the values OPEN used. The optional stop
/// condition is the textual predicate handed to the job factory; its
/// presence also decides whether a `SimulationEnded` notification is
/// emitted when the run completes.
///
/// # Examples
///
/// ```
/// use cadence_core::{ExperimentParams, ParamValue};
///
/// let mut params = ExperimentParams::new();
/// params.set("stop_at", ParamValue::Int(100));
/// params.set("seed", ParamValue::Int(42));
/// assert_eq!(params.get("stop_at"), Some(&ParamValue::Int(100)));
/// assert!(!params.has_stop_condition());
///
/// let params = params.with_stop_condition("cycle >= 100");
/// assert!(params.has_stop_condition());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExperimentParams {
    entries: IndexMap<String, ParamValue>,
    stop_condition: Option<String>,
}

impl ExperimentParams {
    /// Create an empty parameter set with no stop condition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        self.entries.insert(name.into(), value);
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.get(name)
    }

    /// Iterate parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the parameter set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attach a stop condition, consuming self.
    pub fn with_stop_condition(mut self, predicate: impl Into<String>) -> Self {
        self.stop_condition = Some(predicate.into());
        self
    }

    /// The textual stop condition, if one was supplied.
    pub fn stop_condition(&self) -> Option<&str> {
        self.stop_condition.as_deref()
    }

    /// Whether the experiment carries a stop condition.
    ///
    /// Controls end-of-run notification: a run that halts without a
    /// declared stop condition ends silently.
    pub fn has_stop_condition(&self) -> bool {
        self.stop_condition.is_some()
    }
}
