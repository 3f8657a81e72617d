//! Linear least-squares regression.
//!
//! Fits are computed from the normal equations `(XᵀX) β = Xᵀy`, which are
//! symmetric positive definite for a full-rank design and are solved with a
//! Cholesky factorisation. The factor can be kept ([`CholeskyFactor`]) when
//! the same design is reused for many right-hand sides, as in a regression
//! based conditional expectation.
//!
//! # Examples
//!
//! ```
//! use stochastic_core::math::regression::{evaluate_polynomial, polynomial_fit};
//!
//! // y = 1 + 2x - x²
//! let xs = [-2.0, -1.0, 0.0, 1.0, 2.0];
//! let ys: Vec<f64> = xs.iter().map(|x| 1.0 + 2.0 * x - x * x).collect();
//!
//! let coefficients = polynomial_fit(&xs, &ys, 2).unwrap();
//! assert!((evaluate_polynomial(&coefficients, 0.5) - 1.75).abs() < 1e-10);
//! ```

use num_traits::Float;

use crate::types::RegressionError;

/// Pivot size, relative to the diagonal entry, below which the matrix is treated as singular.
const RELATIVE_PIVOT_TOLERANCE: f64 = 1e-13;

/// Lower-triangular Cholesky factor `L` of a symmetric positive definite matrix `A = L Lᵀ`.
#[derive(Clone, Debug, PartialEq)]
pub struct CholeskyFactor {
    lower: Vec<Vec<f64>>,
}

impl CholeskyFactor {
    /// Factorises a symmetric positive definite matrix.
    ///
    /// # Errors
    ///
    /// Returns [`RegressionError::SingularSystem`] if the matrix is not
    /// positive definite, and [`RegressionError::DimensionMismatch`] if it is
    /// not square.
    pub fn decompose(a: &[Vec<f64>]) -> Result<Self, RegressionError> {
        let n = a.len();
        if n == 0 {
            return Err(RegressionError::InsufficientData { got: 0, need: 1 });
        }
        if let Some(row) = a.iter().find(|row| row.len() != n) {
            return Err(RegressionError::DimensionMismatch {
                expected: n,
                got: row.len(),
            });
        }

        let mut l = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..=i {
                let mut sum = a[i][j];
                for k in 0..j {
                    sum -= l[i][k] * l[j][k];
                }

                if i == j {
                    if sum <= a[i][i].abs() * RELATIVE_PIVOT_TOLERANCE {
                        return Err(RegressionError::SingularSystem);
                    }
                    l[i][j] = sum.sqrt();
                } else {
                    l[i][j] = sum / l[j][j];
                }
            }
        }

        Ok(Self { lower: l })
    }

    /// Dimension of the factorised matrix.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    /// Solves `A x = b` by forward and backward substitution.
    ///
    /// # Panics
    ///
    /// Panics if `b` does not match the factor dimension.
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.dimension();
        assert_eq!(b.len(), n, "right-hand side has wrong dimension");
        let l = &self.lower;

        // L y = b
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut sum = b[i];
            for j in 0..i {
                sum -= l[i][j] * y[j];
            }
            y[i] = sum / l[i][i];
        }

        // Lᵀ x = y
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = y[i];
            for j in (i + 1)..n {
                sum -= l[j][i] * x[j];
            }
            x[i] = sum / l[i][i];
        }

        x
    }
}

/// Solves the least-squares problem `min ‖X β - y‖²`.
///
/// `design` holds one row per observation.
///
/// # Errors
///
/// - [`RegressionError::InsufficientData`] if there are fewer observations than coefficients
/// - [`RegressionError::DimensionMismatch`] if rows or observations are inconsistent
/// - [`RegressionError::SingularSystem`] if the design is rank deficient
pub fn least_squares(design: &[Vec<f64>], observations: &[f64]) -> Result<Vec<f64>, RegressionError> {
    let n_obs = design.len();
    if n_obs != observations.len() {
        return Err(RegressionError::DimensionMismatch {
            expected: n_obs,
            got: observations.len(),
        });
    }
    let n_params = design.first().map(Vec::len).unwrap_or(0);
    if n_params == 0 || n_obs < n_params {
        return Err(RegressionError::InsufficientData {
            got: n_obs,
            need: n_params.max(1),
        });
    }

    let mut xtx = vec![vec![0.0; n_params]; n_params];
    let mut xty = vec![0.0; n_params];
    for (row, &y) in design.iter().zip(observations) {
        if row.len() != n_params {
            return Err(RegressionError::DimensionMismatch {
                expected: n_params,
                got: row.len(),
            });
        }
        for i in 0..n_params {
            xty[i] += row[i] * y;
            for j in 0..=i {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..n_params {
        for j in (i + 1)..n_params {
            xtx[i][j] = xtx[j][i];
        }
    }

    Ok(CholeskyFactor::decompose(&xtx)?.solve(&xty))
}

/// Fits a polynomial of the given degree; coefficients are returned in
/// ascending order of powers.
///
/// # Errors
///
/// Same as [`least_squares`]; at least `degree + 1` distinct abscissae are needed.
pub fn polynomial_fit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>, RegressionError> {
    let design: Vec<Vec<f64>> = xs
        .iter()
        .map(|&x| {
            std::iter::successors(Some(1.0), |power| Some(power * x))
                .take(degree + 1)
                .collect()
        })
        .collect();

    least_squares(&design, ys)
}

/// Evaluates a polynomial with ascending coefficients using Horner's scheme.
#[inline]
pub fn evaluate_polynomial<T: Float>(coefficients: &[T], x: T) -> T {
    coefficients
        .iter()
        .rev()
        .fold(T::zero(), |acc, &coefficient| acc * x + coefficient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cholesky_solve() {
        let a = vec![vec![4.0, 2.0], vec![2.0, 3.0]];
        let factor = CholeskyFactor::decompose(&a).unwrap();
        let x = factor.solve(&[2.0, 1.0]);

        // 4x + 2y = 2, 2x + 3y = 1  =>  x = 0.5, y = 0
        assert_relative_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(x[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert_eq!(
            CholeskyFactor::decompose(&a),
            Err(RegressionError::SingularSystem)
        );
    }

    #[test]
    fn test_cholesky_rejects_non_square() {
        let a = vec![vec![1.0, 0.0], vec![0.0]];
        assert!(matches!(
            CholeskyFactor::decompose(&a),
            Err(RegressionError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_least_squares_line() {
        // y = 3 + 2x with symmetric noise that cancels in the fit
        let xs = [0.0, 1.0, 2.0, 3.0];
        let noise = [0.1, -0.1, -0.1, 0.1];
        let design: Vec<Vec<f64>> = xs.iter().map(|&x| vec![1.0, x]).collect();
        let ys: Vec<f64> = xs
            .iter()
            .zip(noise.iter())
            .map(|(x, e)| 3.0 + 2.0 * x + e)
            .collect();

        let beta = least_squares(&design, &ys).unwrap();
        assert_relative_eq!(beta[0], 3.0, epsilon = 1e-10);
        assert_relative_eq!(beta[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_least_squares_insufficient_data() {
        let design = vec![vec![1.0, 0.0, 0.0]];
        assert_eq!(
            least_squares(&design, &[1.0]),
            Err(RegressionError::InsufficientData { got: 1, need: 3 })
        );
    }

    #[test]
    fn test_polynomial_fit_rank_deficient() {
        // Two distinct abscissae cannot determine a quadratic
        let xs = [1.0, 1.0, 2.0, 2.0];
        let ys = [1.0, 1.0, 2.0, 2.0];
        assert_eq!(
            polynomial_fit(&xs, &ys, 2),
            Err(RegressionError::SingularSystem)
        );
    }

    #[test]
    fn test_evaluate_polynomial() {
        let coefficients = [1.0_f64, -2.0, 0.5];
        assert_relative_eq!(evaluate_polynomial(&coefficients, 2.0), -1.0, epsilon = 1e-12);
        assert_eq!(evaluate_polynomial::<f64>(&[], 2.0), 0.0);
    }
}
