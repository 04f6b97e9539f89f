//! Deterministic, pure logic shared by the factory.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod error;
pub mod invariants;
pub mod prompt;
pub mod slug;
pub mod state_graph;
pub mod template;
pub mod types;
pub mod vertical_doc;
