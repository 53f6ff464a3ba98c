use thiserror::Error;

/// Cycle-level failures. Anything that goes wrong for a single deposit is counted in the
/// [`CycleReport`](crate::matcher::CycleReport) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatcherError {
    #[error("No target receiving account is configured. The cycle cannot run.")]
    MissingTargetAccount,
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The cycle deadline passed while loading candidates")]
    Timeout,
}
