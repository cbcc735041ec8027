//! Default constants for dispatch configuration.

/// Reject entry points that violate the target's instruction alignment.
pub const DEFAULT_VALIDATE_ENTRY_POINTS: bool = true;

/// Update the slow-path counters in `DispatchStats`.
pub const DEFAULT_RECORD_STATS: bool = true;

/// Environment variable holding the CLI log filter.
pub const LOG_ENV_VAR: &str = "VARCALL_LOG";

/// Log filter used when `LOG_ENV_VAR` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";
