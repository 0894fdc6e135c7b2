//! Error types for factor construction and scoring.

use thiserror::Error;

/// Result type for factor operations.
pub type Result<T> = std::result::Result<T, FactorError>;

/// Errors raised at the factor boundary.
#[derive(Debug, Error)]
pub enum FactorError {
    /// No factor is registered under this name
    #[error("Unknown factor: {0}")]
    UnknownFactor(String),

    /// A declared input field does not exist in the observation schema
    #[error("Factor '{factor}' requires field '{field}', which is not present in the data")]
    MissingField {
        /// Factor name
        factor: String,
        /// Missing field name
        field: String,
    },

    /// Scorer or factor parameters are invalid
    #[error("Invalid factor configuration: {0}")]
    InvalidConfig(String),
}
