//! Conditional expectation estimators.
//!
//! A [`ConditionalExpectationEstimator`] projects a random variable onto the
//! information available at an earlier time, `E[Y | F_t]`. Early-exercise
//! valuation uses it to estimate continuation values; the adjoint engine
//! re-applies the same projection to derivatives during the backward pass.
//!
//! [`RegressionEstimator`] implements the projection as an ordinary least
//! squares regression on a fixed set of basis functions (Longstaff–Schwartz).
//! The Gram matrix of the basis is factorised once at construction.
//!
//! # Example
//!
//! ```rust
//! use stochastic_core::{ConditionalExpectationEstimator, RandomVariable, RegressionEstimator};
//!
//! let state = RandomVariable::from_paths(vec![-1.0, 0.0, 1.0, 2.0]);
//! let estimator = RegressionEstimator::polynomial(&state, 1).unwrap();
//!
//! // A linear function of the state is reproduced exactly.
//! let target = state.mult(&RandomVariable::scalar(3.0));
//! let projected = estimator.conditional_expectation(&target);
//! assert!((projected.get(3) - 6.0).abs() < 1e-10);
//! ```

use std::fmt;

use crate::math::regression::CholeskyFactor;
use crate::random_variable::RandomVariable;
use crate::types::RegressionError;

/// Projection of a random variable onto an earlier filtration.
///
/// Implementations must be linear and idempotent projections: the adjoint
/// engine relies on this to apply the estimator to derivatives.
pub trait ConditionalExpectationEstimator: fmt::Debug + Send + Sync {
    /// Returns the estimate of `E[value | F_t]`.
    fn conditional_expectation(&self, value: &RandomVariable) -> RandomVariable;
}

/// Least-squares regression estimator on fixed basis functions.
#[derive(Clone, Debug)]
pub struct RegressionEstimator {
    basis: Vec<RandomVariable>,
    factor: CholeskyFactor,
    n_paths: usize,
}

impl RegressionEstimator {
    /// Creates an estimator from basis functions.
    ///
    /// Deterministic basis functions broadcast over all paths.
    ///
    /// # Errors
    ///
    /// - [`RegressionError::InsufficientData`] if the basis is empty or there are
    ///   fewer paths than basis functions
    /// - [`RegressionError::DimensionMismatch`] if basis functions disagree on the path count
    /// - [`RegressionError::SingularSystem`] if the basis is collinear
    pub fn new(basis: Vec<RandomVariable>) -> Result<Self, RegressionError> {
        if basis.is_empty() {
            return Err(RegressionError::InsufficientData { got: 0, need: 1 });
        }

        let n_paths = basis.iter().map(RandomVariable::size).max().unwrap_or(1);
        if let Some(bad) = basis
            .iter()
            .find(|b| !b.is_deterministic() && b.size() != n_paths)
        {
            return Err(RegressionError::DimensionMismatch {
                expected: n_paths,
                got: bad.size(),
            });
        }
        if n_paths < basis.len() {
            return Err(RegressionError::InsufficientData {
                got: n_paths,
                need: basis.len(),
            });
        }

        let k = basis.len();
        let mut gram = vec![vec![0.0; k]; k];
        for i in 0..k {
            for j in 0..=i {
                let entry = (0..n_paths)
                    .map(|p| basis[i].get(p) * basis[j].get(p))
                    .sum::<f64>();
                gram[i][j] = entry;
                gram[j][i] = entry;
            }
        }

        let factor = CholeskyFactor::decompose(&gram)?;
        Ok(Self {
            basis,
            factor,
            n_paths,
        })
    }

    /// Creates an estimator on the monomials `1, x, …, x^degree`.
    ///
    /// # Errors
    ///
    /// See [`RegressionEstimator::new`].
    pub fn polynomial(state: &RandomVariable, degree: usize) -> Result<Self, RegressionError> {
        let basis = std::iter::successors(Some(RandomVariable::one()), |power| {
            Some(power.mult(state))
        })
        .take(degree + 1)
        .collect();

        Self::new(basis)
    }

    /// The basis functions.
    #[inline]
    pub fn basis_functions(&self) -> &[RandomVariable] {
        &self.basis
    }

    /// Number of paths the estimator was built on.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Regression coefficients of `value` on the basis.
    ///
    /// # Panics
    ///
    /// Panics if `value` is a path vector of a different length.
    pub fn coefficients(&self, value: &RandomVariable) -> Vec<f64> {
        assert!(
            value.is_deterministic() || value.size() == self.n_paths,
            "path counts differ: {} vs {}",
            value.size(),
            self.n_paths
        );

        let rhs: Vec<f64> = self
            .basis
            .iter()
            .map(|b| (0..self.n_paths).map(|p| b.get(p) * value.get(p)).sum())
            .collect();

        self.factor.solve(&rhs)
    }
}

impl ConditionalExpectationEstimator for RegressionEstimator {
    fn conditional_expectation(&self, value: &RandomVariable) -> RandomVariable {
        let beta = self.coefficients(value);

        (0..self.n_paths)
            .map(|p| {
                self.basis
                    .iter()
                    .zip(beta.iter())
                    .map(|(b, coefficient)| coefficient * b.get(p))
                    .sum::<f64>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn state() -> RandomVariable {
        RandomVariable::from_paths((0..50).map(|i| i as f64 / 10.0 - 2.5).collect())
    }

    #[test]
    fn test_projection_reproduces_basis_span() {
        let x = state();
        let estimator = RegressionEstimator::polynomial(&x, 2).unwrap();

        let target = x.squared().sub(&x).add(&RandomVariable::scalar(4.0));
        let projected = estimator.conditional_expectation(&target);

        for p in 0..x.size() {
            assert_relative_eq!(projected.get(p), target.get(p), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_projection_is_idempotent() {
        let x = state();
        let estimator = RegressionEstimator::polynomial(&x, 1).unwrap();

        let target = x.exp();
        let once = estimator.conditional_expectation(&target);
        let twice = estimator.conditional_expectation(&once);

        for p in 0..x.size() {
            assert_relative_eq!(once.get(p), twice.get(p), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_projection_preserves_mean_with_constant_basis() {
        let x = state();
        let estimator = RegressionEstimator::polynomial(&x, 1).unwrap();

        let target = x.sin();
        let projected = estimator.conditional_expectation(&target);

        assert_relative_eq!(projected.mean(), target.mean(), epsilon = 1e-10);
    }

    #[test]
    fn test_deterministic_value_broadcasts() {
        let x = state();
        let estimator = RegressionEstimator::polynomial(&x, 1).unwrap();

        let projected = estimator.conditional_expectation(&RandomVariable::scalar(2.0));
        assert_eq!(projected.size(), x.size());
        assert_relative_eq!(projected.get(7), 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_collinear_basis_rejected() {
        let x = state();
        let basis = vec![x.clone(), x.mult(&RandomVariable::scalar(2.0))];

        assert_eq!(
            RegressionEstimator::new(basis).unwrap_err(),
            RegressionError::SingularSystem
        );
    }

    #[test]
    fn test_empty_basis_rejected() {
        assert!(matches!(
            RegressionEstimator::new(vec![]),
            Err(RegressionError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_mismatched_basis_rejected() {
        let basis = vec![
            RandomVariable::from_paths(vec![1.0, 2.0, 3.0]),
            RandomVariable::from_paths(vec![1.0, 2.0]),
        ];

        assert!(matches!(
            RegressionEstimator::new(basis),
            Err(RegressionError::DimensionMismatch { expected: 3, got: 2 })
        ));
    }
}
