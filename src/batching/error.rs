use thiserror::Error;

/// Errors surfaced to callers awaiting a batched result.
///
/// Cloneable so a single batch-wide failure can be handed to every item in
/// the affected batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BatchError {
    /// Rejected before admission; the payload set never entered a batch.
    #[error("invalid submission: {0}")]
    Validation(String),

    /// The worker invocation failed. Every item in the batch receives this;
    /// per-item failure is not representable at the worker boundary.
    #[error("worker failed: {0}")]
    Worker(String),

    /// The worker returned a result count that does not match the number of
    /// payloads it was given.
    #[error("worker returned {actual} results for {expected} payloads")]
    LengthMismatch { expected: usize, actual: usize },

    /// The scheduler was shut down while the caller was waiting.
    #[error("batch scheduler is closed")]
    Closed,
}
