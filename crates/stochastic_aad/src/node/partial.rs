//! Partial derivatives of recorded operators.

use stochastic_core::RandomVariable;

use super::{NodeContext, OperatorNode, OperatorType};
use crate::error::AadError;
use crate::value::Stochastic;

/// Deterministic 0/1 weights from a per-path predicate.
fn indicator<F>(x: &Stochastic, y: &Stochastic, predicate: F) -> Stochastic
where
    F: Fn(f64, f64) -> bool,
{
    Stochastic::Plain(
        x.random_variable()
            .apply2(y.random_variable(), |a, b| if predicate(a, b) { 1.0 } else { 0.0 }),
    )
}

/// `N·1{X = extreme}` split evenly between ties.
fn extreme_weights(x: &RandomVariable, extreme: f64) -> Stochastic {
    let n = x.size() as f64;
    let ties = (0..x.size()).filter(|&p| x.get(p) == extreme).count().max(1) as f64;
    Stochastic::Plain(x.apply(|v| if v == extreme { n / ties } else { 0.0 }))
}

impl OperatorNode {
    pub(super) fn value(&self, index: usize) -> Result<&Stochastic, AadError> {
        self.argument_values
            .get(index)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                AadError::InvalidArgument(format!(
                    "value of argument {} is not retained by node {}",
                    index, self.id
                ))
            })
    }

    /// Partial derivative of this node's value with respect to argument `argument_index`.
    ///
    /// For `Choose` the trigger derivative follows the discontinuity policy
    /// recorded with the node. For the path reductions (`Average`, the
    /// statistics) the result is the per-path sensitivity `N·∂S/∂Xᵢ`; the
    /// upstream derivative is averaged before it is applied.
    ///
    /// # Errors
    ///
    /// Returns [`AadError::InvalidArgument`] for a leaf, for an index the
    /// operator does not have, or if a value the formula reads was not
    /// retained (only possible for a non-differentiable argument).
    pub fn partial_derivative(&self, argument_index: usize) -> Result<Stochastic, AadError> {
        use OperatorType::*;

        let operator = self.operator.ok_or_else(|| {
            AadError::InvalidArgument(format!("node {} is an independent variable", self.id))
        })?;
        if argument_index >= operator.arity() {
            return Err(AadError::InvalidArgument(format!(
                "{} has no argument {}",
                operator, argument_index
            )));
        }

        let x = || self.value(0);
        let y = || self.value(1);
        let z = || self.value(2);

        let partial = match (operator, argument_index) {
            (Add | AddProduct | AddRatio | SubRatio | Average | ConditionalExpectation, 0) => {
                Stochastic::one()
            }
            (Add, 1) => Stochastic::one(),
            (Sub, 0) => Stochastic::one(),
            (Sub, 1) => Stochastic::scalar(-1.0),

            (Mult, 0) => y()?.clone(),
            (Mult, 1) => x()?.clone(),
            (Div, 0) => y()?.invert(),
            (Div, 1) => x()?.div(&y()?.squared()).mult(&-1.0),
            (Pow, 0) => {
                let (x, y) = (x()?, y()?);
                y.mult(&x.pow(&y.sub(&1.0)))
            }
            (Pow, _) => {
                let (x, y) = (x()?, y()?);
                x.pow(y).mult(&x.log())
            }

            (Squared, _) => x()?.mult(&2.0),
            (Sqrt, _) => x()?.sqrt().invert().mult(&0.5),
            (Exp, _) => x()?.exp(),
            (Log, _) => x()?.invert(),
            (Sin, _) => x()?.cos(),
            (Cos, _) => x()?.sin().mult(&-1.0),
            (Invert, _) => x()?.squared().invert().mult(&-1.0),
            (Abs, _) => Stochastic::Plain(
                x()?.random_variable()
                    .apply(|v| if v >= 0.0 { 1.0 } else { -1.0 }),
            ),

            (Cap, 0) => indicator(x()?, y()?, |a, b| a <= b),
            (Cap, _) => indicator(x()?, y()?, |a, b| a > b),
            (Floor, 0) => indicator(x()?, y()?, |a, b| a > b),
            (Floor, _) => indicator(x()?, y()?, |a, b| a <= b),

            (AddProduct, 1) => z()?.clone(),
            (AddProduct, _) => y()?.clone(),
            (AddRatio, 1) => z()?.invert(),
            (AddRatio, _) => y()?.div(&z()?.squared()).mult(&-1.0),
            (SubRatio, 1) => z()?.invert().mult(&-1.0),
            (SubRatio, _) => y()?.div(&z()?.squared()),

            (Accrue, 0) => y()?.mult(z()?).add(&1.0),
            (Accrue, 1) => x()?.mult(z()?),
            (Accrue, _) => x()?.mult(y()?),
            (Discount, index) => {
                let (x, y, z) = (x()?, y()?, z()?);
                let denominator = y.mult(z).add(&1.0);
                match index {
                    0 => denominator.invert(),
                    1 => x.mult(z).div(&denominator.squared()).mult(&-1.0),
                    _ => x.mult(y).div(&denominator.squared()).mult(&-1.0),
                }
            }

            (Choose, 0) => {
                let NodeContext::Choose(config) = &self.context else {
                    return Err(AadError::InvalidArgument(format!(
                        "choose node {} carries no discontinuity settings",
                        self.id
                    )));
                };
                config
                    .discontinuity_policy()
                    .trigger_partial(config, x()?, y()?, z()?)
            }
            (Choose, 1) => Stochastic::Plain(
                x()?.random_variable()
                    .apply(|v| if v >= 0.0 { 1.0 } else { 0.0 }),
            ),
            (Choose, _) => Stochastic::Plain(
                x()?.random_variable()
                    .apply(|v| if v >= 0.0 { 0.0 } else { 1.0 }),
            ),

            (Variance, _) => {
                let x = x()?;
                x.sub(&x.average()).mult(&2.0)
            }
            (SampleVariance, _) => {
                let x = x()?;
                let n = x.size() as f64;
                if n < 2.0 {
                    Stochastic::zero()
                } else {
                    x.sub(&x.average()).mult(&(2.0 * n / (n - 1.0)))
                }
            }
            (StandardDeviation, _) => {
                let x = x()?;
                x.sub(&x.average()).div(&x.standard_deviation())
            }
            (StandardError, _) => {
                let x = x()?;
                let root_n = (x.size() as f64).sqrt();
                x.sub(&x.average())
                    .div(&x.standard_deviation().mult(&root_n))
            }
            (Min, _) => {
                let x = x()?.random_variable();
                extreme_weights(x, x.min())
            }
            (Max, _) => {
                let x = x()?.random_variable();
                extreme_weights(x, x.max())
            }

            (operator, index) => {
                return Err(AadError::InvalidArgument(format!(
                    "{} has no partial derivative for argument {}",
                    operator, index
                )))
            }
        };

        Ok(partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeContext;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn plain(value: f64) -> Stochastic {
        Stochastic::scalar(value)
    }

    fn node(operator: OperatorType, values: &[f64]) -> Arc<OperatorNode> {
        OperatorNode::new(
            operator,
            values.iter().map(|_| Some(OperatorNode::leaf())).collect(),
            values.iter().map(|&v| plain(v)).collect(),
            NodeContext::None,
        )
    }

    fn partial(node: &OperatorNode, index: usize) -> f64 {
        node.partial_derivative(index)
            .unwrap()
            .random_variable()
            .get(0)
    }

    #[test]
    fn test_arithmetic_partials() {
        let div = node(OperatorType::Div, &[3.0, 2.0]);
        assert_relative_eq!(partial(&div, 0), 0.5);
        assert_relative_eq!(partial(&div, 1), -0.75);

        let pow = node(OperatorType::Pow, &[2.0, 3.0]);
        assert_relative_eq!(partial(&pow, 0), 12.0);
        assert_relative_eq!(partial(&pow, 1), 8.0 * 2.0_f64.ln());
    }

    #[test]
    fn test_accrue_discount_partials() {
        let accrue = node(OperatorType::Accrue, &[2.0, 0.5, 4.0]);
        assert_relative_eq!(partial(&accrue, 0), 3.0);
        assert_relative_eq!(partial(&accrue, 1), 8.0);
        assert_relative_eq!(partial(&accrue, 2), 1.0);

        let discount = node(OperatorType::Discount, &[2.0, 0.5, 2.0]);
        assert_relative_eq!(partial(&discount, 0), 0.5);
        assert_relative_eq!(partial(&discount, 1), -1.0);
        assert_relative_eq!(partial(&discount, 2), -0.25);
    }

    #[test]
    fn test_cap_floor_partials() {
        let cap = node(OperatorType::Cap, &[1.0, 2.0]);
        assert_eq!(partial(&cap, 0), 1.0);
        assert_eq!(partial(&cap, 1), 0.0);

        let floor = node(OperatorType::Floor, &[1.0, 2.0]);
        assert_eq!(partial(&floor, 0), 0.0);
        assert_eq!(partial(&floor, 1), 1.0);
    }

    #[test]
    fn test_ratio_partials() {
        let add_ratio = node(OperatorType::AddRatio, &[1.0, 3.0, 2.0]);
        assert_relative_eq!(partial(&add_ratio, 1), 0.5);
        assert_relative_eq!(partial(&add_ratio, 2), -0.75);

        let sub_ratio = node(OperatorType::SubRatio, &[1.0, 3.0, 2.0]);
        assert_relative_eq!(partial(&sub_ratio, 1), -0.5);
        assert_relative_eq!(partial(&sub_ratio, 2), 0.75);
    }

    #[test]
    fn test_index_out_of_range() {
        let exp = node(OperatorType::Exp, &[1.0]);
        assert!(matches!(
            exp.partial_derivative(1),
            Err(AadError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unretained_value_is_reported() {
        // Only the constant factor is kept, so the partial for it cannot be formed.
        let mult = OperatorNode::new(
            OperatorType::Mult,
            vec![Some(OperatorNode::leaf()), None],
            vec![plain(2.0), plain(3.0)],
            NodeContext::None,
        );
        assert_relative_eq!(partial(&mult, 0), 3.0);
        assert!(matches!(
            mult.partial_derivative(1),
            Err(AadError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_max_weights_split_ties() {
        let x = Stochastic::Plain(RandomVariable::from_paths(vec![1.0, 3.0, 3.0, 2.0]));
        let max = OperatorNode::new(
            OperatorType::Max,
            vec![Some(OperatorNode::leaf())],
            vec![x],
            NodeContext::None,
        );

        let weights = max.partial_derivative(0).unwrap();
        assert_eq!(
            weights.random_variable().realizations(),
            vec![0.0, 2.0, 2.0, 0.0]
        );
    }
}
