//! Error types for the adjoint engine.
//!
//! - [`AadError`]: failures of graph construction and gradient evaluation
//! - [`ConfigError`]: invalid engine configuration

use thiserror::Error;

/// Configuration error for the adjoint engine.
///
/// Raised when an [`AadConfig`](crate::AadConfig) is built or loaded with
/// invalid parameters.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid parameter value with name and description.
    #[error("Invalid parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        value: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("Configuration file error: {0}")]
    FileError(String),
}

/// Adjoint engine errors.
///
/// # Examples
/// ```
/// use stochastic_aad::AadError;
///
/// let err = AadError::UnsupportedOperation("apply".to_string());
/// assert_eq!(err.to_string(), "Unsupported operation: apply");
/// ```
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum AadError {
    /// The operation has no derivative rule (generic closures, unknown policies).
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A partial derivative was requested that the node cannot provide.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid engine configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
