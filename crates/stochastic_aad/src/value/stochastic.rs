//! The closed set of value variants.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use stochastic_core::{ConditionalExpectationEstimator, RandomVariable};

use super::{arithmetic_surface, BinaryOp, DifferentiableValue, TernaryOp, UnaryOp};
use crate::error::AadError;

/// A plain stochastic vector or a differentiable value.
///
/// Every operation dispatches on [`Stochastic::type_priority`]: combining a
/// plain value with a differentiable one always yields a differentiable one,
/// whichever side it is on.
///
/// # Examples
///
/// ```rust
/// use stochastic_aad::{AadFactory, Stochastic};
///
/// let factory = AadFactory::default();
/// let x = factory.scalar(3.0);
///
/// let left = Stochastic::scalar(2.0).mult(&x);
/// let right = x.mult(&2.0);
///
/// assert!(left.is_differentiable());
/// assert_eq!(left.random_variable(), right.random_variable());
/// ```
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Stochastic {
    /// Value without provenance; a constant to the adjoint engine.
    Plain(RandomVariable),
    /// Value recorded in an operator tree.
    Differentiable(DifferentiableValue),
}

/// Anything usable as an operand of a value operation.
pub trait Operand {
    /// Converts the operand into a value variant.
    fn to_stochastic(&self) -> Stochastic;
}

impl Operand for f64 {
    #[inline]
    fn to_stochastic(&self) -> Stochastic {
        Stochastic::scalar(*self)
    }
}

impl Operand for RandomVariable {
    #[inline]
    fn to_stochastic(&self) -> Stochastic {
        Stochastic::Plain(self.clone())
    }
}

impl Operand for Stochastic {
    #[inline]
    fn to_stochastic(&self) -> Stochastic {
        self.clone()
    }
}

impl Operand for DifferentiableValue {
    #[inline]
    fn to_stochastic(&self) -> Stochastic {
        Stochastic::Differentiable(self.clone())
    }
}

impl<T: Operand + ?Sized> Operand for &T {
    #[inline]
    fn to_stochastic(&self) -> Stochastic {
        (**self).to_stochastic()
    }
}

impl Stochastic {
    /// Deterministic plain value.
    #[inline]
    pub fn scalar(value: f64) -> Self {
        Self::Plain(RandomVariable::scalar(value))
    }

    /// Deterministic plain zero.
    #[inline]
    pub fn zero() -> Self {
        Self::scalar(0.0)
    }

    /// Deterministic plain one.
    #[inline]
    pub fn one() -> Self {
        Self::scalar(1.0)
    }

    /// Dispatch rank: 0 for a plain value, one more than the payload for a
    /// differentiable value.
    pub fn type_priority(&self) -> u32 {
        match self {
            Self::Plain(_) => 0,
            Self::Differentiable(value) => value.type_priority(),
        }
    }

    /// Returns true for a differentiable value.
    #[inline]
    pub fn is_differentiable(&self) -> bool {
        matches!(self, Self::Differentiable(_))
    }

    /// The differentiable value, if any.
    #[inline]
    pub fn as_differentiable(&self) -> Option<&DifferentiableValue> {
        match self {
            Self::Plain(_) => None,
            Self::Differentiable(value) => Some(value),
        }
    }

    /// Id of a differentiable value.
    #[inline]
    pub fn id(&self) -> Option<u64> {
        self.as_differentiable().map(DifferentiableValue::id)
    }

    /// Realizations, unwrapping any level of differentiable values.
    pub fn random_variable(&self) -> &RandomVariable {
        match self {
            Self::Plain(value) => value,
            Self::Differentiable(value) => value.values().random_variable(),
        }
    }

    /// Number of realizations.
    #[inline]
    pub fn size(&self) -> usize {
        self.random_variable().size()
    }

    /// Returns true if the realizations are a broadcast scalar.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        self.random_variable().is_deterministic()
    }

    /// Returns true if any realization is NaN.
    #[inline]
    pub fn is_nan(&self) -> bool {
        self.random_variable().is_nan()
    }

    arithmetic_surface!(Stochastic);

    /// Applies `f` to every realization of a plain value.
    ///
    /// # Errors
    ///
    /// Returns [`AadError::UnsupportedOperation`] for a differentiable value:
    /// a closure has no derivative rule.
    pub fn apply<F>(&self, f: F) -> Result<Stochastic, AadError>
    where
        F: Fn(f64) -> f64,
    {
        match self {
            Self::Plain(x) => Ok(Self::Plain(x.apply(f))),
            Self::Differentiable(value) => value.apply(f).map(Self::Differentiable),
        }
    }

    /// Applies `f` to paired realizations of plain values.
    ///
    /// # Errors
    ///
    /// Returns [`AadError::UnsupportedOperation`] if either operand is differentiable.
    pub fn apply2<O, F>(&self, other: &O, f: F) -> Result<Stochastic, AadError>
    where
        O: Operand + ?Sized,
        F: Fn(f64, f64) -> f64,
    {
        match (self, &other.to_stochastic()) {
            (Self::Plain(x), Self::Plain(y)) => Ok(Self::Plain(x.apply2(y, f))),
            _ => Err(unsupported_closure()),
        }
    }

    /// Applies `f` to triples of realizations of plain values.
    ///
    /// # Errors
    ///
    /// Returns [`AadError::UnsupportedOperation`] if any operand is differentiable.
    pub fn apply3<A, B, F>(&self, y: &A, z: &B, f: F) -> Result<Stochastic, AadError>
    where
        A: Operand + ?Sized,
        B: Operand + ?Sized,
        F: Fn(f64, f64, f64) -> f64,
    {
        match (self, &y.to_stochastic(), &z.to_stochastic()) {
            (Self::Plain(x), Self::Plain(y), Self::Plain(z)) => Ok(Self::Plain(x.apply3(y, z, f))),
            _ => Err(unsupported_closure()),
        }
    }

    pub(crate) fn unary(&self, op: UnaryOp) -> Stochastic {
        match self {
            Self::Plain(x) => Self::Plain(op.apply(x)),
            Self::Differentiable(value) => Self::Differentiable(value.unary(op)),
        }
    }

    pub(crate) fn projected(
        &self,
        estimator: &Arc<dyn ConditionalExpectationEstimator>,
    ) -> Stochastic {
        match self {
            Self::Plain(x) => Self::Plain(estimator.conditional_expectation(x)),
            Self::Differentiable(value) => Self::Differentiable(value.projected(estimator)),
        }
    }

    pub(crate) fn binary(&self, other: &Stochastic, op: BinaryOp) -> Stochastic {
        match (self, other) {
            (Self::Plain(x), Self::Plain(y)) => Self::Plain(op.apply(x, y)),
            (Self::Plain(_), Self::Differentiable(other)) => {
                Self::Differentiable(other.binary(self, op.mirrored()))
            }
            (Self::Differentiable(value), _) => Self::Differentiable(value.binary(other, op)),
        }
    }

    pub(crate) fn ternary(&self, y: &Stochastic, z: &Stochastic, op: TernaryOp) -> Stochastic {
        match (self, y, z) {
            (Self::Differentiable(value), _, _) => Self::Differentiable(value.ternary(y, z, op)),
            (Self::Plain(x), Self::Plain(y), Self::Plain(z)) => Self::Plain(op.apply(x, y, z)),
            (Self::Plain(x), _, _) => decompose_plain(x, y, z, op),
        }
    }
}

/// A plain receiver with a differentiable argument, as binary operations.
fn decompose_plain(
    x: &RandomVariable,
    y: &Stochastic,
    z: &Stochastic,
    op: TernaryOp,
) -> Stochastic {
    let receiver = Stochastic::Plain(x.clone());
    match op {
        TernaryOp::AddProduct => receiver.binary(&y.binary(z, BinaryOp::Mult), BinaryOp::Add),
        TernaryOp::AddRatio => receiver.binary(&y.binary(z, BinaryOp::Div), BinaryOp::Add),
        TernaryOp::SubRatio => receiver.binary(&y.binary(z, BinaryOp::Div), BinaryOp::Sub),
        TernaryOp::Accrue => receiver.binary(
            &y.binary(z, BinaryOp::Mult)
                .binary(&Stochastic::one(), BinaryOp::Add),
            BinaryOp::Mult,
        ),
        TernaryOp::Discount => receiver.binary(
            &y.binary(z, BinaryOp::Mult)
                .binary(&Stochastic::one(), BinaryOp::Add),
            BinaryOp::Div,
        ),
        TernaryOp::Choose => {
            let indicator = Stochastic::Plain(x.choose(&RandomVariable::one(), &RandomVariable::zero()));
            y.binary(z, BinaryOp::Sub)
                .binary(&indicator, BinaryOp::Mult)
                .binary(z, BinaryOp::Add)
        }
    }
}

pub(super) fn unsupported_closure() -> AadError {
    AadError::UnsupportedOperation(
        "closures cannot be applied to differentiable values; use the operator methods"
            .to_string(),
    )
}

impl Default for Stochastic {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<f64> for Stochastic {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

impl From<Vec<f64>> for Stochastic {
    fn from(paths: Vec<f64>) -> Self {
        Self::Plain(RandomVariable::from_paths(paths))
    }
}

impl From<RandomVariable> for Stochastic {
    fn from(value: RandomVariable) -> Self {
        Self::Plain(value)
    }
}

impl From<DifferentiableValue> for Stochastic {
    fn from(value: DifferentiableValue) -> Self {
        Self::Differentiable(value)
    }
}

impl fmt::Display for Stochastic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(value) => write!(f, "{}", value),
            Self::Differentiable(value) => write!(f, "{}", value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::AadFactory;
    use approx::assert_relative_eq;

    #[test]
    fn test_plain_arithmetic_stays_plain() {
        let x = Stochastic::from(vec![1.0, 2.0]);
        let y = x.mult(&3.0).add(&1.0);

        assert!(!y.is_differentiable());
        assert_eq!(y.type_priority(), 0);
        assert_eq!(y.random_variable().realizations(), vec![4.0, 7.0]);
    }

    #[test]
    fn test_plain_receiver_with_differentiable_operand() {
        let factory = AadFactory::default();
        let x = factory.scalar(4.0);

        let result = Stochastic::scalar(10.0).sub(&x);
        let value = result.as_differentiable().unwrap();

        assert_eq!(result.type_priority(), 1);
        assert_eq!(value.random_variable().get(0), 6.0);
        assert_eq!(
            value.node().operator(),
            Some(crate::node::OperatorType::Sub)
        );
        // Recorded in operand order: SUB(10, x)
        assert_eq!(value.node().argument_ids(), vec![None, Some(x.id())]);
    }

    #[test]
    fn test_plain_receiver_decomposes_ternary() {
        let factory = AadFactory::default();
        let y = factory.scalar(3.0);

        let result = Stochastic::scalar(1.0).add_product(&y, &2.0);
        assert!(result.is_differentiable());
        assert_eq!(result.random_variable().get(0), 7.0);

        let gradient = result.as_differentiable().unwrap().gradient(None).unwrap();
        assert_relative_eq!(gradient[&y.id()].random_variable().get(0), 2.0);
    }

    #[test]
    fn test_apply_on_plain_and_differentiable() {
        let plain = Stochastic::scalar(2.0);
        assert_eq!(
            plain.apply(|v| v * v).unwrap().random_variable().get(0),
            4.0
        );

        let x: Stochastic = AadFactory::default().scalar(2.0).into();
        assert!(matches!(
            x.apply(|v| v * v),
            Err(AadError::UnsupportedOperation(_))
        ));
        assert!(matches!(
            plain.apply2(&x, |a, b| a + b),
            Err(AadError::UnsupportedOperation(_))
        ));
        assert!(plain.apply3(&1.0, &2.0, |a, b, c| a + b + c).is_ok());
    }

    #[test]
    fn test_statistics_are_deterministic() {
        let x = Stochastic::from(vec![1.0, 2.0, 3.0, 4.0]);
        assert!(x.variance().is_deterministic());
        assert_relative_eq!(x.variance().random_variable().get(0), 1.25);
        assert_eq!(x.max().random_variable().get(0), 4.0);
    }
}
