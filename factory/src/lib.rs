//! Vertical agent factory.
//!
//! Turns a short subject description ("Veterinary Clinics") into a generated
//! agent package by walking a fixed sequence of phases, pausing for approval
//! before the expensive ones. The crate is split the usual way:
//!
//! - **[`core`]**: Pure, deterministic logic (slugs, template assembly,
//!   state-graph rendering, invariants). No I/O.
//! - **[`io`]**: Configuration, run-state persistence and artifact storage.
//! - **[`phases`]**: One handler per phase.
//! - **[`orchestrator`]**: The run state machine and its approval gates.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrator;
pub mod phases;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
