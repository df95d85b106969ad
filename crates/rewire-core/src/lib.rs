//! Domain model, pure rule engine, and shared primitives for Rewire.
//!
//! This crate has no I/O: it defines the value types Store persists and
//! RuleEngine reasons over, plus the evaluation functions themselves.
//! Everything here is deterministic and independently testable without a
//! database or network connection.

mod error;
mod ids;
mod model;
mod params;
mod rules;

pub use error::CoreError;
pub use ids::generate_token;
pub use model::{
    AlertTrial, Evidence, Expectation, ExpectationType, Observation, ObservationKind,
    TrialStatus, Violation, ViolationCode,
};
pub use params::{AlertPathParams, Params, ScheduleParams};
pub use rules::{alertpath_should_send_test, schedule_evaluate, RuleOutcome};
