//! Error handling for the replacement-policy core.
//!
//! Every error here is fatal to the surrounding simulation: the core assumes
//! its caller's invariants (valid owner identifiers, in-range way indices,
//! a complete configuration) hold, and faults hard when they do not. This is
//! a modeling tool, not a production cache.

use thiserror::Error;
use tracing::error;

/// Result type for replacement-policy operations.
pub type Result<T> = std::result::Result<T, ReplacementError>;

/// Errors surfaced by the replacement-policy core.
#[derive(Debug, Error)]
pub enum ReplacementError {
    /// A core invariant was violated: the victim search exhausted its bounded
    /// number of aging sweeps, or a way index was out of range.
    #[error("invariant violation in set {set_id}: {detail}")]
    InvariantViolation {
        /// The set in which the violation occurred.
        set_id: u64,
        /// Human-readable detail for diagnostics.
        detail: String,
    },

    /// A raw owner/core id outside `{0, 1}` was supplied by the caller.
    #[error("invalid owner id {raw} in set {set_id}: only 0 and 1 are valid")]
    InvalidOwner {
        /// The set in which the invalid owner was observed.
        set_id: u64,
        /// The out-of-range raw id as supplied by the caller.
        raw: u8,
    },

    /// A required configuration key was absent.
    #[error("missing required configuration key: {key}")]
    ConfigMissing {
        /// The fully-qualified key that was expected, e.g. `llc/srrip/bits`.
        key: String,
    },

    /// The block-info layer declared the chosen way an invalid replacement
    /// candidate.
    #[error("way {way} in set {set_id} is not a valid replacement candidate")]
    ReplacementCandidateInvalid {
        /// The set in which the invalid candidate was chosen.
        set_id: u64,
        /// The offending way index.
        way: usize,
    },

    /// An ambient-tooling failure (logging setup, CLI argument parsing) that
    /// is fatal to the harness but is not a core-invariant violation.
    #[error("{0}")]
    Other(String),
}

/// Logs `err` at `error!` and returns it, mirroring the log-then-convert
/// pattern used throughout this crate's fatal paths.
pub(crate) fn fatal(err: ReplacementError) -> ReplacementError {
    error!(error = %err, "replacement core invariant failure");
    err
}
