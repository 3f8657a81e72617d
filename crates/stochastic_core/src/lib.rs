//! # stochastic_core: Stochastic Vector Foundation for Adjoint AD
//!
//! ## Layer 1 (Foundation) Role
//!
//! stochastic_core is the bottom layer of the workspace, providing:
//! - The stochastic vector value type [`RandomVariable`] (`random_variable`)
//! - Conditional expectation estimators (`estimator`)
//! - Least-squares and polynomial regression helpers (`math::regression`)
//! - Error types: [`RegressionError`] (`types::error`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other workspace crates, with minimal
//! external dependencies:
//! - num-traits: Traits for generic numerical computation
//! - thiserror: Error derivation
//! - serde: Serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use stochastic_core::RandomVariable;
//!
//! let x = RandomVariable::from_paths(vec![1.0, 2.0, 3.0, 4.0]);
//! let y = x.mult(&RandomVariable::scalar(2.0)).add(&RandomVariable::scalar(1.0));
//!
//! assert_eq!(y.realizations(), vec![3.0, 5.0, 7.0, 9.0]);
//! assert!((y.mean() - 6.0).abs() < 1e-12);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Enable serialisation for `RandomVariable`

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod estimator;
pub mod math;
pub mod random_variable;
pub mod types;

pub use estimator::{ConditionalExpectationEstimator, RegressionEstimator};
pub use random_variable::RandomVariable;
pub use types::RegressionError;
