//! Errors raised while traversing the metadata tree.
//!
//! "No match" is never an error: lookups return `Ok(None)` or an empty list.
//! These variants cover an abandoned query and internal misuse.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The caller's cancellation token fired before traversal finished.
    #[error("resolution cancelled")]
    Cancelled,

    /// An operation was invoked on a node that cannot support it
    /// (e.g. value suggestions on a non-leaf node). Indicates a caller bug.
    #[error("internal contract violation: {0}")]
    ContractViolation(String),
}
