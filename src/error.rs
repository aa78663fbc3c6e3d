//! Error types for feature-effect computation

use thiserror::Error;

/// Result type alias for effect operations
pub type Result<T> = std::result::Result<T, EffectError>;

/// Ways a model can break the batched-prediction contract
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("expected {expected} predictions, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("non-finite prediction {value} at row {row}")]
    NonFinite { row: usize, value: f64 },
}

/// Main error type for feature-effect computation
#[derive(Error, Debug)]
pub enum EffectError {
    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Insufficient data for feature '{feature}': {reason}")]
    InsufficientData { feature: String, reason: String },

    #[error("Invalid center {value} for feature '{feature}': no matching grid value")]
    InvalidCenter { feature: String, value: String },

    #[error("Model contract violation: {0}")]
    ContractViolation(Violation),

    #[error("Type mismatch for feature '{feature}': expected {expected}, got {actual}")]
    TypeMismatch {
        feature: String,
        expected: String,
        actual: String,
    },

    #[error("Row index {index} out of bounds (n_rows={len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    #[error("Computation cancelled")]
    Cancelled,
}

impl EffectError {
    /// Whether this error was raised because the model broke its contract
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, EffectError::ContractViolation(_))
    }
}

impl From<Violation> for EffectError {
    fn from(violation: Violation) -> Self {
        EffectError::ContractViolation(violation)
    }
}

impl From<polars::error::PolarsError> for EffectError {
    fn from(err: polars::error::PolarsError) -> Self {
        EffectError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for EffectError {
    fn from(err: serde_json::Error) -> Self {
        EffectError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for EffectError {
    fn from(err: ndarray::ShapeError) -> Self {
        EffectError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
