//! Operator overloads.
//!
//! `+ - * /` and unary `-` for owned and borrowed values, with `f64` and
//! [`RandomVariable`] on the right and `f64` on the left. The result type is
//! the type of the left operand, except that `f64` on the left yields the type
//! of the right operand.

use std::ops::{Add, Div, Mul, Neg, Sub};

use stochastic_core::RandomVariable;

use super::{DifferentiableValue, Stochastic};

macro_rules! binary_ops {
    (@pair $base:ident; $lhs:ty; [$($rhs:ty),+]) => {
        $(
            impl Add<$rhs> for $lhs {
                type Output = $base;

                #[inline]
                fn add(self, rhs: $rhs) -> $base {
                    $base::add(&self, &rhs)
                }
            }

            impl Sub<$rhs> for $lhs {
                type Output = $base;

                #[inline]
                fn sub(self, rhs: $rhs) -> $base {
                    $base::sub(&self, &rhs)
                }
            }

            impl Mul<$rhs> for $lhs {
                type Output = $base;

                #[inline]
                fn mul(self, rhs: $rhs) -> $base {
                    $base::mult(&self, &rhs)
                }
            }

            impl Div<$rhs> for $lhs {
                type Output = $base;

                #[inline]
                fn div(self, rhs: $rhs) -> $base {
                    $base::div(&self, &rhs)
                }
            }
        )+
    };
    (@lhs $base:ident; $rhs:tt; $($lhs:ty),+) => {
        $(binary_ops!(@pair $base; $lhs; $rhs);)+
    };
    ($base:ident: $($lhs:ty),+ => $($rhs:ty),+) => {
        binary_ops!(@lhs $base; [$($rhs),+]; $($lhs),+);
    };
}

macro_rules! scalar_lhs_ops {
    ($($rhs:ty => $base:ident),+) => {
        $(
            impl Add<$rhs> for f64 {
                type Output = $base;

                #[inline]
                fn add(self, rhs: $rhs) -> $base {
                    $base::add(&rhs, &self)
                }
            }

            impl Sub<$rhs> for f64 {
                type Output = $base;

                #[inline]
                fn sub(self, rhs: $rhs) -> $base {
                    $base::bus(&rhs, &self)
                }
            }

            impl Mul<$rhs> for f64 {
                type Output = $base;

                #[inline]
                fn mul(self, rhs: $rhs) -> $base {
                    $base::mult(&rhs, &self)
                }
            }

            impl Div<$rhs> for f64 {
                type Output = $base;

                #[inline]
                fn div(self, rhs: $rhs) -> $base {
                    $base::vid(&rhs, &self)
                }
            }
        )+
    };
}

macro_rules! neg_ops {
    ($($value:ty => $base:ident),+) => {
        $(
            impl Neg for $value {
                type Output = $base;

                #[inline]
                fn neg(self) -> $base {
                    $base::mult(&self, &-1.0)
                }
            }
        )+
    };
}

binary_ops!(Stochastic: Stochastic, &Stochastic
    => Stochastic, &Stochastic, DifferentiableValue, &DifferentiableValue, f64, RandomVariable);

binary_ops!(DifferentiableValue: DifferentiableValue, &DifferentiableValue
    => Stochastic, &Stochastic, DifferentiableValue, &DifferentiableValue, f64, RandomVariable);

scalar_lhs_ops!(
    Stochastic => Stochastic,
    &Stochastic => Stochastic,
    DifferentiableValue => DifferentiableValue,
    &DifferentiableValue => DifferentiableValue
);

neg_ops!(
    Stochastic => Stochastic,
    &Stochastic => Stochastic,
    DifferentiableValue => DifferentiableValue,
    &DifferentiableValue => DifferentiableValue
);
