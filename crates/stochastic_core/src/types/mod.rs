//! Core error types.
//!
//! This module provides:
//! - `error`: Structured error types for regression and estimator construction
//!
//! # Re-exports
//!
//! [`RegressionError`] is re-exported at this module level.

pub mod error;

pub use error::RegressionError;
