//! Shared argument parsing for the `rewire` and `rewire-ctl` binaries.
//!
//! Split into a library so the `clap` derive surface is unit-testable
//! without spawning a process, matching the discipline the workspace
//! already uses for its other CLI crates.

pub mod config;
pub mod ctl;
