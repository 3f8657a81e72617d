//! Error types for structured error handling.
//!
//! This module provides:
//! - `RegressionError`: Errors from least-squares fits and estimator construction

use thiserror::Error;

/// Regression-related errors.
///
/// Raised by the least-squares helpers in [`crate::math::regression`] and by
/// [`crate::RegressionEstimator`] construction.
///
/// # Examples
/// ```
/// use stochastic_core::RegressionError;
///
/// let err = RegressionError::InsufficientData { got: 2, need: 3 };
/// assert_eq!(format!("{}", err), "Insufficient data points: got 2, need at least 3");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegressionError {
    /// Not enough observations to determine the requested number of coefficients.
    #[error("Insufficient data points: got {got}, need at least {need}")]
    InsufficientData {
        /// Number of observations provided
        got: usize,
        /// Minimum number of observations required
        need: usize,
    },

    /// The normal equations are not positive definite (collinear basis).
    #[error("Regression system is singular")]
    SingularSystem,

    /// Basis functions or observations have inconsistent path counts.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected number of paths
        expected: usize,
        /// Actual number of paths
        got: usize,
    },
}
