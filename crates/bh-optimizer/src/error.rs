//! Error types for optimization runs.

use thiserror::Error;

/// Result type for optimization operations.
pub type OptimizeResult<T> = Result<T, OptimizeError>;

/// Errors that end an optimization run without a result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizeError {
    /// Invalid input (e.g. an empty starting point).
    #[error("invalid input in {context}")]
    InvalidInput { context: String },

    /// Invalid option value.
    #[error("invalid parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// The run detected a numerical breakdown it cannot recover from.
    #[error("numerical error: {message}")]
    Numerical { message: String },

    /// The stop flag was raised.
    #[error("interrupted after {iterations} iterations")]
    Interrupted { iterations: usize },
}
