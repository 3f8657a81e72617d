//! Stochastic vector value type.
//!
//! A [`RandomVariable`] is either a deterministic scalar or a vector of
//! per-path realizations. Realizations live in shared immutable storage, so
//! cloning is a reference-count increment and every operation returns a new
//! value.
//!
//! # Broadcasting
//!
//! A deterministic operand broadcasts against a path vector. Two path
//! vectors must have the same length.
//!
//! # Numerical Edge Cases
//!
//! Division by zero or the logarithm of a non-positive value are not trapped:
//! they produce IEEE infinities or NaN, detectable via [`RandomVariable::is_nan`].
//!
//! # Examples
//!
//! ```rust
//! use stochastic_core::RandomVariable;
//!
//! let x = RandomVariable::from_paths(vec![-1.0, 0.5, 2.0]);
//! let payoff = x.choose(&RandomVariable::scalar(1.0), &RandomVariable::scalar(0.0));
//!
//! assert_eq!(payoff.realizations(), vec![0.0, 1.0, 1.0]);
//! ```

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Storage for the realizations of a random variable.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
enum Realizations {
    Scalar(f64),
    Paths(Arc<[f64]>),
}

/// Immutable stochastic vector: a deterministic scalar or per-path realizations.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RandomVariable {
    realizations: Realizations,
}

impl RandomVariable {
    /// Creates a deterministic random variable.
    #[inline]
    pub fn scalar(value: f64) -> Self {
        Self {
            realizations: Realizations::Scalar(value),
        }
    }

    /// Creates a random variable from per-path realizations.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stochastic_core::RandomVariable;
    ///
    /// let x = RandomVariable::from_paths(vec![1.0, 2.0]);
    /// assert_eq!(x.size(), 2);
    /// assert!(!x.is_deterministic());
    /// ```
    #[inline]
    pub fn from_paths(paths: Vec<f64>) -> Self {
        Self {
            realizations: Realizations::Paths(paths.into()),
        }
    }

    /// Deterministic zero.
    #[inline]
    pub fn zero() -> Self {
        Self::scalar(0.0)
    }

    /// Deterministic one.
    #[inline]
    pub fn one() -> Self {
        Self::scalar(1.0)
    }

    /// Returns true if the value is a broadcast scalar.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        matches!(self.realizations, Realizations::Scalar(_))
    }

    /// Number of realizations (1 for a deterministic value).
    #[inline]
    pub fn size(&self) -> usize {
        match &self.realizations {
            Realizations::Scalar(_) => 1,
            Realizations::Paths(paths) => paths.len(),
        }
    }

    /// Realization on path `index`; a deterministic value broadcasts.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds for a path vector.
    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        match &self.realizations {
            Realizations::Scalar(value) => *value,
            Realizations::Paths(paths) => paths[index],
        }
    }

    /// The scalar value of a deterministic variable.
    #[inline]
    pub fn as_scalar(&self) -> Option<f64> {
        match &self.realizations {
            Realizations::Scalar(value) => Some(*value),
            Realizations::Paths(_) => None,
        }
    }

    /// Borrowed path realizations, if not deterministic.
    #[inline]
    pub fn as_slice(&self) -> Option<&[f64]> {
        match &self.realizations {
            Realizations::Scalar(_) => None,
            Realizations::Paths(paths) => Some(paths),
        }
    }

    /// Copies the realizations into a vector (length 1 for a scalar).
    pub fn realizations(&self) -> Vec<f64> {
        match &self.realizations {
            Realizations::Scalar(value) => vec![*value],
            Realizations::Paths(paths) => paths.to_vec(),
        }
    }

    /// Returns true if any realization is NaN.
    pub fn is_nan(&self) -> bool {
        match &self.realizations {
            Realizations::Scalar(value) => value.is_nan(),
            Realizations::Paths(paths) => paths.iter().any(|v| v.is_nan()),
        }
    }

    // =========================================================================
    // Elementwise kernels
    // =========================================================================

    /// Applies `f` to every realization.
    pub fn apply<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        match &self.realizations {
            Realizations::Scalar(value) => Self::scalar(f(*value)),
            Realizations::Paths(paths) => paths.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Applies `f` to paired realizations, broadcasting deterministic operands.
    ///
    /// # Panics
    ///
    /// Panics if both operands are path vectors of different lengths.
    pub fn apply2<F>(&self, other: &Self, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64,
    {
        match (&self.realizations, &other.realizations) {
            (Realizations::Scalar(a), Realizations::Scalar(b)) => Self::scalar(f(*a, *b)),
            (Realizations::Scalar(a), Realizations::Paths(b)) => {
                b.iter().map(|&b| f(*a, b)).collect()
            }
            (Realizations::Paths(a), Realizations::Scalar(b)) => {
                a.iter().map(|&a| f(a, *b)).collect()
            }
            (Realizations::Paths(a), Realizations::Paths(b)) => {
                assert_eq!(
                    a.len(),
                    b.len(),
                    "path counts differ: {} vs {}",
                    a.len(),
                    b.len()
                );
                a.iter().zip(b.iter()).map(|(&a, &b)| f(a, b)).collect()
            }
        }
    }

    /// Applies `f` to triples of realizations, broadcasting deterministic operands.
    ///
    /// # Panics
    ///
    /// Panics if two path-vector operands have different lengths.
    pub fn apply3<F>(&self, y: &Self, z: &Self, f: F) -> Self
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        let sizes = [self, y, z]
            .iter()
            .filter(|rv| !rv.is_deterministic())
            .map(|rv| rv.size())
            .collect::<Vec<_>>();

        match sizes.first() {
            None => Self::scalar(f(self.get(0), y.get(0), z.get(0))),
            Some(&n) => {
                assert!(
                    sizes.iter().all(|&size| size == n),
                    "path counts differ: {:?}",
                    sizes
                );
                (0..n).map(|i| f(self.get(i), y.get(i), z.get(i))).collect()
            }
        }
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    /// `self + other`
    #[inline]
    pub fn add(&self, other: &Self) -> Self {
        self.apply2(other, |x, y| x + y)
    }

    /// `self - other`
    #[inline]
    pub fn sub(&self, other: &Self) -> Self {
        self.apply2(other, |x, y| x - y)
    }

    /// Mirrored subtraction: `other - self`
    #[inline]
    pub fn bus(&self, other: &Self) -> Self {
        self.apply2(other, |x, y| y - x)
    }

    /// `self * other`
    #[inline]
    pub fn mult(&self, other: &Self) -> Self {
        self.apply2(other, |x, y| x * y)
    }

    /// `self / other`
    #[inline]
    pub fn div(&self, other: &Self) -> Self {
        self.apply2(other, |x, y| x / y)
    }

    /// Mirrored division: `other / self`
    #[inline]
    pub fn vid(&self, other: &Self) -> Self {
        self.apply2(other, |x, y| y / x)
    }

    /// `self ^ exponent`
    #[inline]
    pub fn pow(&self, exponent: &Self) -> Self {
        self.apply2(exponent, f64::powf)
    }

    /// `min(self, cap)`; NaN if either side is NaN.
    #[inline]
    pub fn cap(&self, cap: &Self) -> Self {
        self.apply2(cap, nan_min)
    }

    /// `max(self, floor)`; NaN if either side is NaN.
    #[inline]
    pub fn floor(&self, floor: &Self) -> Self {
        self.apply2(floor, nan_max)
    }

    /// `self * self`
    #[inline]
    pub fn squared(&self) -> Self {
        self.apply(|x| x * x)
    }

    /// Square root.
    #[inline]
    pub fn sqrt(&self) -> Self {
        self.apply(f64::sqrt)
    }

    /// Exponential.
    #[inline]
    pub fn exp(&self) -> Self {
        self.apply(f64::exp)
    }

    /// Natural logarithm.
    #[inline]
    pub fn log(&self) -> Self {
        self.apply(f64::ln)
    }

    /// Sine.
    #[inline]
    pub fn sin(&self) -> Self {
        self.apply(f64::sin)
    }

    /// Cosine.
    #[inline]
    pub fn cos(&self) -> Self {
        self.apply(f64::cos)
    }

    /// Absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        self.apply(f64::abs)
    }

    /// `1 / self`
    #[inline]
    pub fn invert(&self) -> Self {
        self.apply(|x| 1.0 / x)
    }

    /// `self + factor1 * factor2`
    #[inline]
    pub fn add_product(&self, factor1: &Self, factor2: &Self) -> Self {
        self.apply3(factor1, factor2, |x, y, z| x + y * z)
    }

    /// `self + numerator / denominator`
    #[inline]
    pub fn add_ratio(&self, numerator: &Self, denominator: &Self) -> Self {
        self.apply3(numerator, denominator, |x, y, z| x + y / z)
    }

    /// `self - numerator / denominator`
    #[inline]
    pub fn sub_ratio(&self, numerator: &Self, denominator: &Self) -> Self {
        self.apply3(numerator, denominator, |x, y, z| x - y / z)
    }

    /// Simple-compounding accrual: `self * (1 + rate * period_length)`
    #[inline]
    pub fn accrue(&self, rate: &Self, period_length: &Self) -> Self {
        self.apply3(rate, period_length, |x, r, t| x * (1.0 + r * t))
    }

    /// Simple-compounding discount: `self / (1 + rate * period_length)`
    #[inline]
    pub fn discount(&self, rate: &Self, period_length: &Self) -> Self {
        self.apply3(rate, period_length, |x, r, t| x / (1.0 + r * t))
    }

    /// Elementwise branch: `self >= 0 ? if_non_negative : if_negative`
    #[inline]
    pub fn choose(&self, if_non_negative: &Self, if_negative: &Self) -> Self {
        self.apply3(if_non_negative, if_negative, |trigger, y, z| {
            if trigger >= 0.0 {
                y
            } else {
                z
            }
        })
    }

    // =========================================================================
    // Reductions
    // =========================================================================

    /// Arithmetic mean over paths.
    pub fn mean(&self) -> f64 {
        match &self.realizations {
            Realizations::Scalar(value) => *value,
            Realizations::Paths(paths) => paths.iter().sum::<f64>() / paths.len() as f64,
        }
    }

    /// Population variance over paths.
    pub fn variance(&self) -> f64 {
        match &self.realizations {
            Realizations::Scalar(_) => 0.0,
            Realizations::Paths(paths) => {
                let mean = self.mean();
                paths.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / paths.len() as f64
            }
        }
    }

    /// Unbiased sample variance over paths (0 for fewer than two paths).
    pub fn sample_variance(&self) -> f64 {
        let n = self.size();
        if n < 2 {
            return 0.0;
        }
        self.variance() * n as f64 / (n - 1) as f64
    }

    /// Population standard deviation.
    #[inline]
    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Standard error of the mean: `σ / √N`.
    #[inline]
    pub fn standard_error(&self) -> f64 {
        self.standard_deviation() / (self.size() as f64).sqrt()
    }

    /// Smallest realization; NaN if any realization is NaN.
    pub fn min(&self) -> f64 {
        match &self.realizations {
            Realizations::Scalar(value) => *value,
            Realizations::Paths(paths) => paths.iter().copied().fold(f64::INFINITY, nan_min),
        }
    }

    /// Largest realization; NaN if any realization is NaN.
    pub fn max(&self) -> f64 {
        match &self.realizations {
            Realizations::Scalar(value) => *value,
            Realizations::Paths(paths) => paths.iter().copied().fold(f64::NEG_INFINITY, nan_max),
        }
    }

    /// Mean as a deterministic random variable.
    #[inline]
    pub fn average(&self) -> Self {
        Self::scalar(self.mean())
    }
}

fn nan_min(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        f64::NAN
    } else {
        x.min(y)
    }
}

fn nan_max(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        f64::NAN
    } else {
        x.max(y)
    }
}

impl Default for RandomVariable {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<f64> for RandomVariable {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

impl From<Vec<f64>> for RandomVariable {
    fn from(paths: Vec<f64>) -> Self {
        Self::from_paths(paths)
    }
}

impl FromIterator<f64> for RandomVariable {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        Self {
            realizations: Realizations::Paths(iter.into_iter().collect()),
        }
    }
}

impl fmt::Display for RandomVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.realizations {
            Realizations::Scalar(value) => write!(f, "{}", value),
            Realizations::Paths(paths) => write!(
                f,
                "[{} paths, mean {}, stdev {}]",
                paths.len(),
                self.mean(),
                self.standard_deviation()
            ),
        }
    }
}
