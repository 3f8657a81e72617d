//! CLI error type.

use stochastic_aad::{AadError, ConfigError};
use thiserror::Error;

/// Errors reported by the `aad` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid engine configuration from file, environment or flags.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failure inside the adjoint engine.
    #[error("Engine error: {0}")]
    Engine(#[from] AadError),

    /// Invalid command line argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Output could not be encoded.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Result alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
