//! Periodic expectation evaluator and offline invariant probe for Rewire.
//!
//! [`Checker`] walks enabled expectations on a fixed period, asks
//! `rewire_core`'s RuleEngine functions what evidence implies, and writes
//! the difference to the Store. [`InvariantProbe`] re-derives the same
//! facts independently and compares them to persisted state, for
//! diagnosing drift offline.

mod checker;
mod config;
mod error;
mod probe;

pub use checker::{Checker, TickReport};
pub use config::CheckerConfig;
pub use error::CheckerError;
pub use probe::{InvariantProbe, InvariantResult};
