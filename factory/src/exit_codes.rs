//! Stable exit codes for factory CLI commands.

/// Command succeeded (for `auto`, the run reached `complete`).
pub const OK: i32 = 0;
/// Invalid input, out-of-order call, or any other failure.
pub const INVALID: i32 = 1;
/// The run is parked at an approval gate.
pub const AWAITING_APPROVAL: i32 = 2;
