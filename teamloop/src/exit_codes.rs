//! Stable exit codes for teamloop CLI commands.

use crate::error::{RunError, RunErrorKind};

/// Command succeeded; the supervisor terminated the run.
pub const OK: i32 = 0;
/// Invalid team file, arguments or other setup errors.
pub const INVALID: i32 = 1;
/// The routing decision violated the protocol.
pub const PROTOCOL_VIOLATION: i32 = 2;
/// A routing or executor integration call failed.
pub const INTEGRATION_FAILURE: i32 = 3;
/// The supervisor never terminated within `max_iterations`.
pub const ITERATION_LIMIT: i32 = 4;
/// The run was cancelled (Ctrl-C).
pub const CANCELLED: i32 = 130;

/// Exit code reported for a failed run.
pub fn for_run_error(err: &RunError) -> i32 {
    match err.kind {
        RunErrorKind::ProtocolViolation(_) => PROTOCOL_VIOLATION,
        RunErrorKind::IntegrationFailure { .. } => INTEGRATION_FAILURE,
        RunErrorKind::IterationLimitExceeded { .. } => ITERATION_LIMIT,
        RunErrorKind::Cancelled { .. } => CANCELLED,
    }
}
