//! Value variants and type-priority dispatch.
//!
//! [`Stochastic`] is the closed set of values the engine operates on: a plain
//! [`RandomVariable`] or a [`DifferentiableValue`] recording its provenance.
//! Each variant reports a type priority (0 for plain values, one more than
//! its payload for differentiable values). When the right operand of a binary
//! operation has the higher priority, the operation is redirected to it,
//! using the mirrored operator for non-commutative operations (`sub` becomes
//! `bus`, `div` becomes `vid`), so `2.0 - x` and `x.bus(2.0)` record the same
//! node. Operands of lower priority are recorded as constants.
//!
//! Three-operand operations whose receiver is outranked by an argument are
//! expressed through dispatched binary operations, e.g. `x.add_product(y, z)`
//! becomes `x + y·z`.

mod differentiable;
mod ops;
mod stochastic;

pub use differentiable::DifferentiableValue;
pub use stochastic::{Operand, Stochastic};

use stochastic_core::RandomVariable;

use crate::node::OperatorType;

/// Generates the shared arithmetic surface of the value types.
///
/// The implementing type provides `unary`, `binary`, `ternary` and `projected`.
macro_rules! arithmetic_surface {
    ($out:ty) => {
        /// `self²`
        #[inline]
        pub fn squared(&self) -> $out {
            self.unary(UnaryOp::Squared)
        }

        /// `√self`
        #[inline]
        pub fn sqrt(&self) -> $out {
            self.unary(UnaryOp::Sqrt)
        }

        /// `exp(self)`
        #[inline]
        pub fn exp(&self) -> $out {
            self.unary(UnaryOp::Exp)
        }

        /// `ln(self)`
        #[inline]
        pub fn log(&self) -> $out {
            self.unary(UnaryOp::Log)
        }

        /// `sin(self)`
        #[inline]
        pub fn sin(&self) -> $out {
            self.unary(UnaryOp::Sin)
        }

        /// `cos(self)`
        #[inline]
        pub fn cos(&self) -> $out {
            self.unary(UnaryOp::Cos)
        }

        /// `1 / self`
        #[inline]
        pub fn invert(&self) -> $out {
            self.unary(UnaryOp::Invert)
        }

        /// `|self|`
        #[inline]
        pub fn abs(&self) -> $out {
            self.unary(UnaryOp::Abs)
        }

        /// Mean over paths, as a deterministic value.
        ///
        /// Its gradient is 1 on every path, not `1/N`: gradient entries are
        /// per-path sensitivities whose path mean is the derivative of the
        /// expectation.
        #[inline]
        pub fn average(&self) -> $out {
            self.unary(UnaryOp::Average)
        }

        /// Population variance over paths, as a deterministic value.
        #[inline]
        pub fn variance(&self) -> $out {
            self.unary(UnaryOp::Variance)
        }

        /// Unbiased sample variance over paths, as a deterministic value.
        #[inline]
        pub fn sample_variance(&self) -> $out {
            self.unary(UnaryOp::SampleVariance)
        }

        /// Population standard deviation, as a deterministic value.
        #[inline]
        pub fn standard_deviation(&self) -> $out {
            self.unary(UnaryOp::StandardDeviation)
        }

        /// Standard error of the mean, as a deterministic value.
        #[inline]
        pub fn standard_error(&self) -> $out {
            self.unary(UnaryOp::StandardError)
        }

        /// Smallest realization, as a deterministic value.
        #[inline]
        pub fn min(&self) -> $out {
            self.unary(UnaryOp::Min)
        }

        /// Largest realization, as a deterministic value.
        #[inline]
        pub fn max(&self) -> $out {
            self.unary(UnaryOp::Max)
        }

        /// Projection onto an earlier filtration with `estimator`.
        #[inline]
        pub fn conditional_expectation(
            &self,
            estimator: &std::sync::Arc<dyn stochastic_core::ConditionalExpectationEstimator>,
        ) -> $out {
            self.projected(estimator)
        }

        /// `self + other`
        #[inline]
        pub fn add<O: Operand + ?Sized>(&self, other: &O) -> $out {
            self.binary(&other.to_stochastic(), BinaryOp::Add)
        }

        /// `self - other`
        #[inline]
        pub fn sub<O: Operand + ?Sized>(&self, other: &O) -> $out {
            self.binary(&other.to_stochastic(), BinaryOp::Sub)
        }

        /// `other - self`
        #[inline]
        pub fn bus<O: Operand + ?Sized>(&self, other: &O) -> $out {
            self.binary(&other.to_stochastic(), BinaryOp::Bus)
        }

        /// `self * other`
        #[inline]
        pub fn mult<O: Operand + ?Sized>(&self, other: &O) -> $out {
            self.binary(&other.to_stochastic(), BinaryOp::Mult)
        }

        /// `self / other`
        #[inline]
        pub fn div<O: Operand + ?Sized>(&self, other: &O) -> $out {
            self.binary(&other.to_stochastic(), BinaryOp::Div)
        }

        /// `other / self`
        #[inline]
        pub fn vid<O: Operand + ?Sized>(&self, other: &O) -> $out {
            self.binary(&other.to_stochastic(), BinaryOp::Vid)
        }

        /// `self ^ exponent`
        #[inline]
        pub fn pow<O: Operand + ?Sized>(&self, exponent: &O) -> $out {
            self.binary(&exponent.to_stochastic(), BinaryOp::Pow)
        }

        /// `min(self, cap)`
        #[inline]
        pub fn cap<O: Operand + ?Sized>(&self, cap: &O) -> $out {
            self.binary(&cap.to_stochastic(), BinaryOp::Cap)
        }

        /// `max(self, floor)`
        #[inline]
        pub fn floor<O: Operand + ?Sized>(&self, floor: &O) -> $out {
            self.binary(&floor.to_stochastic(), BinaryOp::Floor)
        }

        /// `self + factor1 * factor2`
        #[inline]
        pub fn add_product<A, B>(&self, factor1: &A, factor2: &B) -> $out
        where
            A: Operand + ?Sized,
            B: Operand + ?Sized,
        {
            self.ternary(
                &factor1.to_stochastic(),
                &factor2.to_stochastic(),
                TernaryOp::AddProduct,
            )
        }

        /// `self + numerator / denominator`
        #[inline]
        pub fn add_ratio<A, B>(&self, numerator: &A, denominator: &B) -> $out
        where
            A: Operand + ?Sized,
            B: Operand + ?Sized,
        {
            self.ternary(
                &numerator.to_stochastic(),
                &denominator.to_stochastic(),
                TernaryOp::AddRatio,
            )
        }

        /// `self - numerator / denominator`
        #[inline]
        pub fn sub_ratio<A, B>(&self, numerator: &A, denominator: &B) -> $out
        where
            A: Operand + ?Sized,
            B: Operand + ?Sized,
        {
            self.ternary(
                &numerator.to_stochastic(),
                &denominator.to_stochastic(),
                TernaryOp::SubRatio,
            )
        }

        /// `self * (1 + rate * period_length)`
        #[inline]
        pub fn accrue<A, B>(&self, rate: &A, period_length: &B) -> $out
        where
            A: Operand + ?Sized,
            B: Operand + ?Sized,
        {
            self.ternary(
                &rate.to_stochastic(),
                &period_length.to_stochastic(),
                TernaryOp::Accrue,
            )
        }

        /// `self / (1 + rate * period_length)`
        #[inline]
        pub fn discount<A, B>(&self, rate: &A, period_length: &B) -> $out
        where
            A: Operand + ?Sized,
            B: Operand + ?Sized,
        {
            self.ternary(
                &rate.to_stochastic(),
                &period_length.to_stochastic(),
                TernaryOp::Discount,
            )
        }

        /// Elementwise branch `self >= 0 ? if_non_negative : if_negative`.
        ///
        /// The derivative with respect to `self` follows the configured
        /// [`DiscontinuityPolicy`](crate::DiscontinuityPolicy).
        #[inline]
        pub fn choose<A, B>(&self, if_non_negative: &A, if_negative: &B) -> $out
        where
            A: Operand + ?Sized,
            B: Operand + ?Sized,
        {
            self.ternary(
                &if_non_negative.to_stochastic(),
                &if_negative.to_stochastic(),
                TernaryOp::Choose,
            )
        }
    };
}

pub(crate) use arithmetic_surface;

/// Single-argument operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Squared,
    Sqrt,
    Exp,
    Log,
    Sin,
    Cos,
    Invert,
    Abs,
    Average,
    Min,
    Max,
    Variance,
    SampleVariance,
    StandardDeviation,
    StandardError,
}

impl UnaryOp {
    pub(crate) fn operator(self) -> OperatorType {
        match self {
            Self::Squared => OperatorType::Squared,
            Self::Sqrt => OperatorType::Sqrt,
            Self::Exp => OperatorType::Exp,
            Self::Log => OperatorType::Log,
            Self::Sin => OperatorType::Sin,
            Self::Cos => OperatorType::Cos,
            Self::Invert => OperatorType::Invert,
            Self::Abs => OperatorType::Abs,
            Self::Average => OperatorType::Average,
            Self::Min => OperatorType::Min,
            Self::Max => OperatorType::Max,
            Self::Variance => OperatorType::Variance,
            Self::SampleVariance => OperatorType::SampleVariance,
            Self::StandardDeviation => OperatorType::StandardDeviation,
            Self::StandardError => OperatorType::StandardError,
        }
    }

    pub(crate) fn apply(self, x: &RandomVariable) -> RandomVariable {
        match self {
            Self::Squared => x.squared(),
            Self::Sqrt => x.sqrt(),
            Self::Exp => x.exp(),
            Self::Log => x.log(),
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Invert => x.invert(),
            Self::Abs => x.abs(),
            Self::Average => x.average(),
            Self::Min => RandomVariable::scalar(x.min()),
            Self::Max => RandomVariable::scalar(x.max()),
            Self::Variance => RandomVariable::scalar(x.variance()),
            Self::SampleVariance => RandomVariable::scalar(x.sample_variance()),
            Self::StandardDeviation => RandomVariable::scalar(x.standard_deviation()),
            Self::StandardError => RandomVariable::scalar(x.standard_error()),
        }
    }
}

/// Two-argument operations, including the mirrored forms used by dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    /// `other - self`
    Bus,
    Mult,
    Div,
    /// `other / self`
    Vid,
    Pow,
    /// `other ^ self`
    RPow,
    Cap,
    Floor,
}

impl BinaryOp {
    /// The operation with operands exchanged.
    pub(crate) fn mirrored(self) -> Self {
        match self {
            Self::Sub => Self::Bus,
            Self::Bus => Self::Sub,
            Self::Div => Self::Vid,
            Self::Vid => Self::Div,
            Self::Pow => Self::RPow,
            Self::RPow => Self::Pow,
            commutative => commutative,
        }
    }

    /// Recorded operator, and whether the receiver is its second argument.
    pub(crate) fn recorded(self) -> (OperatorType, bool) {
        match self {
            Self::Add => (OperatorType::Add, false),
            Self::Sub => (OperatorType::Sub, false),
            Self::Bus => (OperatorType::Sub, true),
            Self::Mult => (OperatorType::Mult, false),
            Self::Div => (OperatorType::Div, false),
            Self::Vid => (OperatorType::Div, true),
            Self::Pow => (OperatorType::Pow, false),
            Self::RPow => (OperatorType::Pow, true),
            Self::Cap => (OperatorType::Cap, false),
            Self::Floor => (OperatorType::Floor, false),
        }
    }

    pub(crate) fn apply(self, x: &RandomVariable, y: &RandomVariable) -> RandomVariable {
        match self {
            Self::Add => x.add(y),
            Self::Sub => x.sub(y),
            Self::Bus => x.bus(y),
            Self::Mult => x.mult(y),
            Self::Div => x.div(y),
            Self::Vid => x.vid(y),
            Self::Pow => x.pow(y),
            Self::RPow => y.pow(x),
            Self::Cap => x.cap(y),
            Self::Floor => x.floor(y),
        }
    }
}

/// Three-argument operations; the receiver is argument 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TernaryOp {
    AddProduct,
    AddRatio,
    SubRatio,
    Accrue,
    Discount,
    Choose,
}

impl TernaryOp {
    pub(crate) fn operator(self) -> OperatorType {
        match self {
            Self::AddProduct => OperatorType::AddProduct,
            Self::AddRatio => OperatorType::AddRatio,
            Self::SubRatio => OperatorType::SubRatio,
            Self::Accrue => OperatorType::Accrue,
            Self::Discount => OperatorType::Discount,
            Self::Choose => OperatorType::Choose,
        }
    }

    pub(crate) fn apply(
        self,
        x: &RandomVariable,
        y: &RandomVariable,
        z: &RandomVariable,
    ) -> RandomVariable {
        match self {
            Self::AddProduct => x.add_product(y, z),
            Self::AddRatio => x.add_ratio(y, z),
            Self::SubRatio => x.sub_ratio(y, z),
            Self::Accrue => x.accrue(y, z),
            Self::Discount => x.discount(y, z),
            Self::Choose => x.choose(y, z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrored_is_involution() {
        use BinaryOp::*;
        for op in [Add, Sub, Bus, Mult, Div, Vid, Pow, RPow, Cap, Floor] {
            assert_eq!(op.mirrored().mirrored(), op);
        }
    }

    #[test]
    fn test_mirrored_apply_swaps_operands() {
        let x = RandomVariable::scalar(2.0);
        let y = RandomVariable::scalar(8.0);

        for op in [BinaryOp::Sub, BinaryOp::Div, BinaryOp::Pow, BinaryOp::Cap] {
            assert_eq!(op.apply(&x, &y), op.mirrored().apply(&y, &x));
        }
    }
}
