//! Error types for the anomaly scoring library

use thiserror::Error;

/// Result type alias for anomaly operations
pub type Result<T> = std::result::Result<T, AnomalyError>;

/// Main error type for model fitting and scoring
#[derive(Error, Debug)]
pub enum AnomalyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Computation error: {0}")]
    ComputationError(String),
}

impl From<ndarray::ShapeError> for AnomalyError {
    fn from(err: ndarray::ShapeError) -> Self {
        AnomalyError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
