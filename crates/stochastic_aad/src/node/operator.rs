//! Closed set of recorded operators.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Operator recorded by an operator-tree node.
///
/// Argument order follows the value method that records the operator: the
/// receiver is argument 0, e.g. `x.add_product(y, z)` records
/// `AddProduct(x, y, z)` and `trigger.choose(a, b)` records `Choose(trigger, a, b)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OperatorType {
    /// `X + Y`
    Add,
    /// `X - Y`
    Sub,
    /// `X * Y`
    Mult,
    /// `X / Y`
    Div,
    /// `X²`
    Squared,
    /// `√X`
    Sqrt,
    /// `ln X`
    Log,
    /// `exp X`
    Exp,
    /// `sin X`
    Sin,
    /// `cos X`
    Cos,
    /// `1 / X`
    Invert,
    /// `min(X, Y)`
    Cap,
    /// `max(X, Y)`
    Floor,
    /// `|X|`
    Abs,
    /// `X + Y·Z`
    AddProduct,
    /// `X + Y/Z`
    AddRatio,
    /// `X - Y/Z`
    SubRatio,
    /// `X·(1 + Y·Z)`
    Accrue,
    /// `X / (1 + Y·Z)`
    Discount,
    /// `X^Y`
    Pow,
    /// `X ≥ 0 ? Y : Z`
    Choose,
    /// Mean over paths.
    Average,
    /// Projection onto an earlier filtration.
    ConditionalExpectation,
    /// Smallest realization.
    Min,
    /// Largest realization.
    Max,
    /// Population variance.
    Variance,
    /// Population standard deviation.
    StandardDeviation,
    /// Standard error of the mean.
    StandardError,
    /// Unbiased sample variance.
    SampleVariance,
}

impl OperatorType {
    /// Number of arguments the operator takes.
    pub fn arity(self) -> usize {
        use OperatorType::*;
        match self {
            Squared | Sqrt | Log | Exp | Sin | Cos | Invert | Abs | Average
            | ConditionalExpectation | Min | Max | Variance | StandardDeviation | StandardError
            | SampleVariance => 1,
            Add | Sub | Mult | Div | Cap | Floor | Pow => 2,
            AddProduct | AddRatio | SubRatio | Accrue | Discount | Choose => 3,
        }
    }

    /// Indices of the argument values read by the partial derivative with
    /// respect to `argument`.
    ///
    /// A node retains an argument value exactly when it is read by the
    /// partial derivative of some differentiable argument.
    pub fn reads(self, argument: usize) -> &'static [usize] {
        use OperatorType::*;
        match (self, argument) {
            (Add | Sub, _) => &[],
            (Mult, 0) => &[1],
            (Mult, 1) => &[0],
            (Div, 0) => &[1],
            (Div, 1) => &[0, 1],
            (Pow | Cap | Floor, _) => &[0, 1],
            (AddProduct, 1) => &[2],
            (AddProduct, 2) => &[1],
            (AddRatio | SubRatio, 1) => &[2],
            (AddRatio | SubRatio, 2) => &[1, 2],
            (AddProduct | AddRatio | SubRatio, _) => &[],
            (Accrue, 0) => &[1, 2],
            (Accrue, 1) => &[0, 2],
            (Accrue, 2) => &[0, 1],
            (Discount, _) => &[0, 1, 2],
            (Choose, 0) => &[0, 1, 2],
            (Choose, _) => &[0],
            (Average | ConditionalExpectation, _) => &[],
            _ => &[0],
        }
    }

    /// Operators whose upstream derivative is replaced by its path average.
    #[inline]
    pub(crate) fn averages_upstream(self) -> bool {
        use OperatorType::*;
        matches!(
            self,
            Average | Min | Max | Variance | StandardDeviation | StandardError | SampleVariance
        )
    }

    /// Upper-case name, as used in serialized graphs.
    pub fn name(self) -> &'static str {
        use OperatorType::*;
        match self {
            Add => "ADD",
            Sub => "SUB",
            Mult => "MULT",
            Div => "DIV",
            Squared => "SQUARED",
            Sqrt => "SQRT",
            Log => "LOG",
            Exp => "EXP",
            Sin => "SIN",
            Cos => "COS",
            Invert => "INVERT",
            Cap => "CAP",
            Floor => "FLOOR",
            Abs => "ABS",
            AddProduct => "ADD_PRODUCT",
            AddRatio => "ADD_RATIO",
            SubRatio => "SUB_RATIO",
            Accrue => "ACCRUE",
            Discount => "DISCOUNT",
            Pow => "POW",
            Choose => "CHOOSE",
            Average => "AVERAGE",
            ConditionalExpectation => "CONDITIONAL_EXPECTATION",
            Min => "MIN",
            Max => "MAX",
            Variance => "VARIANCE",
            StandardDeviation => "STANDARD_DEVIATION",
            StandardError => "STANDARD_ERROR",
            SampleVariance => "SAMPLE_VARIANCE",
        }
    }
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
