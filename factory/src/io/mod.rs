//! I/O helpers for factory commands.

pub mod config;
pub mod run_state;
pub mod store;
