//! Structured logging setup for the `sim` harness and for anything embedding
//! this crate that wants the same `tracing` configuration.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{ReplacementError, Result};

/// Initializes a global `tracing` subscriber at the given filter directive,
/// e.g. `"info"` or `"llc_partition=debug"`.
///
/// Returns an error rather than panicking if a subscriber is already set, or
/// if `level` is not a valid filter directive.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| ReplacementError::Other(format!("invalid log filter {level:?}: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| ReplacementError::Other("logging already initialized".into()))
}
