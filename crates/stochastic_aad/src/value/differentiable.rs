//! Differentiable values.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use stochastic_core::{ConditionalExpectationEstimator, RandomVariable};

use super::stochastic::unsupported_closure;
use super::{arithmetic_surface, BinaryOp, Operand, Stochastic, TernaryOp, UnaryOp};
use crate::config::AadConfig;
use crate::error::AadError;
use crate::gradient::{compute_gradient, GradientMap};
use crate::node::{NodeContext, OperatorNode};

/// A value tagged with the operator-tree node that produced it.
///
/// Values are immutable; every operation returns a new value whose node
/// records the operation. The id of a value is the id of its node and is the
/// key of its entry in a [`GradientMap`].
///
/// The payload may itself be differentiable. Differentiating the gradient
/// of such a value again gives second-order derivatives.
///
/// # Examples
///
/// ```rust
/// use stochastic_aad::AadFactory;
///
/// let factory = AadFactory::default();
/// let x = factory.scalar(5.0);
/// let y = factory.scalar(2.0);
///
/// let z = x.pow(&2.0).add(&y.pow(&3.0));
/// assert_eq!(z.random_variable().get(0), 33.0);
///
/// let gradient = z.gradient(None).unwrap();
/// assert!((gradient[&x.id()].random_variable().get(0) - 10.0).abs() < 1e-12);
/// assert!((gradient[&y.id()].random_variable().get(0) - 12.0).abs() < 1e-12);
/// ```
#[derive(Clone)]
pub struct DifferentiableValue {
    values: Arc<Stochastic>,
    node: Arc<OperatorNode>,
    config: Arc<AadConfig>,
}

impl DifferentiableValue {
    /// Creates an independent variable with a fresh id.
    pub fn new(values: impl Into<Stochastic>, config: Arc<AadConfig>) -> Self {
        Self::from_parts(values.into(), OperatorNode::leaf(), config)
    }

    pub(crate) fn from_parts(
        values: Stochastic,
        node: Arc<OperatorNode>,
        config: Arc<AadConfig>,
    ) -> Self {
        Self {
            values: Arc::new(values),
            node,
            config,
        }
    }

    /// Unique id; the key of this value in a gradient map.
    #[inline]
    pub fn id(&self) -> u64 {
        self.node.id()
    }

    /// The payload.
    #[inline]
    pub fn values(&self) -> &Stochastic {
        &self.values
    }

    /// Realizations of the payload, unwrapping nested differentiable values.
    #[inline]
    pub fn random_variable(&self) -> &RandomVariable {
        self.values.random_variable()
    }

    /// Number of realizations.
    #[inline]
    pub fn size(&self) -> usize {
        self.random_variable().size()
    }

    /// The node that produced this value.
    #[inline]
    pub fn node(&self) -> &Arc<OperatorNode> {
        &self.node
    }

    /// Engine configuration used for the backward pass.
    #[inline]
    pub fn config(&self) -> &Arc<AadConfig> {
        &self.config
    }

    /// One more than the priority of the payload.
    pub fn type_priority(&self) -> u32 {
        1 + self.values.type_priority()
    }

    /// Derivatives of this value with respect to the nodes of its graph.
    ///
    /// With a filter, the result contains only the filtered ids that were
    /// reached. See [`compute_gradient`].
    ///
    /// # Errors
    ///
    /// Propagates [`AadError`] from the partial derivatives.
    pub fn gradient(&self, filter: Option<&HashSet<u64>>) -> Result<GradientMap, AadError> {
        compute_gradient(&self.node, &self.config, filter)
    }

    arithmetic_surface!(DifferentiableValue);

    /// Always fails: a closure has no derivative rule.
    ///
    /// # Errors
    ///
    /// Returns [`AadError::UnsupportedOperation`].
    pub fn apply<F>(&self, _f: F) -> Result<DifferentiableValue, AadError>
    where
        F: Fn(f64) -> f64,
    {
        Err(unsupported_closure())
    }

    /// Always fails: a closure has no derivative rule.
    ///
    /// # Errors
    ///
    /// Returns [`AadError::UnsupportedOperation`].
    pub fn apply2<O, F>(&self, _other: &O, _f: F) -> Result<DifferentiableValue, AadError>
    where
        O: Operand + ?Sized,
        F: Fn(f64, f64) -> f64,
    {
        Err(unsupported_closure())
    }

    /// Always fails: a closure has no derivative rule.
    ///
    /// # Errors
    ///
    /// Returns [`AadError::UnsupportedOperation`].
    pub fn apply3<A, B, F>(&self, _y: &A, _z: &B, _f: F) -> Result<DifferentiableValue, AadError>
    where
        A: Operand + ?Sized,
        B: Operand + ?Sized,
        F: Fn(f64, f64, f64) -> f64,
    {
        Err(unsupported_closure())
    }

    fn derive(&self, values: Stochastic, node: Arc<OperatorNode>) -> Self {
        Self::from_parts(values, node, Arc::clone(&self.config))
    }

    /// Node reference and payload of an operand at this value's level; an
    /// operand of lower priority is a constant.
    fn split(&self, operand: &Stochastic) -> (Option<Arc<OperatorNode>>, Stochastic) {
        match operand {
            Stochastic::Differentiable(other) if other.type_priority() == self.type_priority() => {
                (Some(Arc::clone(&other.node)), (*other.values).clone())
            }
            constant => (None, constant.clone()),
        }
    }

    pub(crate) fn unary(&self, op: UnaryOp) -> DifferentiableValue {
        let node = OperatorNode::new(
            op.operator(),
            vec![Some(Arc::clone(&self.node))],
            vec![(*self.values).clone()],
            NodeContext::None,
        );
        self.derive(self.values.unary(op), node)
    }

    pub(crate) fn projected(
        &self,
        estimator: &Arc<dyn ConditionalExpectationEstimator>,
    ) -> DifferentiableValue {
        let node = OperatorNode::new(
            crate::node::OperatorType::ConditionalExpectation,
            vec![Some(Arc::clone(&self.node))],
            vec![(*self.values).clone()],
            NodeContext::ConditionalExpectation(Arc::clone(estimator)),
        );
        self.derive(self.values.projected(estimator), node)
    }

    pub(crate) fn binary(&self, other: &Stochastic, op: BinaryOp) -> DifferentiableValue {
        if let Stochastic::Differentiable(higher) = other {
            if higher.type_priority() > self.type_priority() {
                return higher.binary(&Stochastic::Differentiable(self.clone()), op.mirrored());
            }
        }

        let (other_node, other_value) = self.split(other);
        let values = self.values.binary(&other_value, op);

        let (operator, swapped) = op.recorded();
        let mut arguments = vec![Some(Arc::clone(&self.node)), other_node];
        let mut argument_values = vec![(*self.values).clone(), other_value];
        if swapped {
            arguments.swap(0, 1);
            argument_values.swap(0, 1);
        }

        let node = OperatorNode::new(operator, arguments, argument_values, NodeContext::None);
        self.derive(values, node)
    }

    pub(crate) fn ternary(
        &self,
        y: &Stochastic,
        z: &Stochastic,
        op: TernaryOp,
    ) -> DifferentiableValue {
        let priority = self.type_priority();
        if y.type_priority() > priority || z.type_priority() > priority {
            return self.decompose(y, z, op);
        }

        let (y_node, y_value) = self.split(y);
        let (z_node, z_value) = self.split(z);
        let values = self.values.ternary(&y_value, &z_value, op);

        let context = match op {
            TernaryOp::Choose => NodeContext::Choose(Arc::clone(&self.config)),
            _ => NodeContext::None,
        };
        let node = OperatorNode::new(
            op.operator(),
            vec![Some(Arc::clone(&self.node)), y_node, z_node],
            vec![(*self.values).clone(), y_value, z_value],
            context,
        );
        self.derive(values, node)
    }

    /// A receiver outranked by an argument, as binary operations.
    fn decompose(&self, y: &Stochastic, z: &Stochastic, op: TernaryOp) -> DifferentiableValue {
        let one = Stochastic::one();
        match op {
            TernaryOp::AddProduct => self.binary(&y.binary(z, BinaryOp::Mult), BinaryOp::Add),
            TernaryOp::AddRatio => self.binary(&y.binary(z, BinaryOp::Div), BinaryOp::Add),
            TernaryOp::SubRatio => self.binary(&y.binary(z, BinaryOp::Div), BinaryOp::Sub),
            TernaryOp::Accrue => self.binary(
                &y.binary(z, BinaryOp::Mult).binary(&one, BinaryOp::Add),
                BinaryOp::Mult,
            ),
            TernaryOp::Discount => self.binary(
                &y.binary(z, BinaryOp::Mult).binary(&one, BinaryOp::Add),
                BinaryOp::Div,
            ),
            TernaryOp::Choose => {
                let indicator = self.ternary(&one, &Stochastic::zero(), TernaryOp::Choose);
                indicator
                    .binary(&y.binary(z, BinaryOp::Sub), BinaryOp::Mult)
                    .binary(z, BinaryOp::Add)
            }
        }
    }
}

impl fmt::Debug for DifferentiableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DifferentiableValue")
            .field("id", &self.id())
            .field("operator", &self.node.operator())
            .field("values", &self.values)
            .finish()
    }
}

impl fmt::Display for DifferentiableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id(), self.values)
    }
}
