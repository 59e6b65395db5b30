//! Evaluation error types.

use thiserror::Error;

/// Errors that make a whole evaluation run meaningless.
///
/// Failures of individual queries are never reported here; they are
/// scored as misses and recorded on the run's outcomes.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The evaluator was given zero queries.
    #[error("evaluation batch is empty")]
    EmptyBatch,

    /// Cancellation arrived before any query was scored.
    #[error("evaluation cancelled before any query was scored ({abandoned} abandoned)")]
    Cancelled { abandoned: usize },
}

/// Convenience alias for evaluation results.
pub type EvalResult<T> = std::result::Result<T, EvalError>;
