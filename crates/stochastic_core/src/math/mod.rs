//! Numerical helpers.
//!
//! - [`regression`]: Least-squares fits via Cholesky-factorised normal
//!   equations, polynomial fitting and evaluation

pub mod regression;

pub use regression::{evaluate_polynomial, least_squares, polynomial_fit, CholeskyFactor};
