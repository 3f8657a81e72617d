//! Operator-tree nodes.
//!
//! An [`OperatorNode`] records one operation of the forward pass: the
//! operator, references to the nodes of its differentiable arguments and the
//! argument values its partial derivatives need. Nodes only reference their
//! arguments, never their dependents, so a graph is an acyclic structure of
//! shared `Arc`s, reclaimed when the last value referencing it is dropped.
//!
//! # Leaves
//!
//! An independent variable is a node without operator and without arguments.
//! Its gradient entry is what callers look up after a backward pass.
//!
//! # Retention
//!
//! A node keeps the value of argument `i` only if the partial derivative with
//! respect to some differentiable argument reads it (see
//! [`OperatorType::reads`]). For example `x * 3` with `x` differentiable keeps
//! the constant `3` but not `x`, and `x + y` keeps nothing.

mod operator;
mod partial;
mod propagate;

pub use operator::OperatorType;

use std::fmt;
use std::sync::Arc;

use stochastic_core::ConditionalExpectationEstimator;

use crate::config::AadConfig;
use crate::id::IdGenerator;
use crate::value::Stochastic;

/// Replay state a node needs during the backward pass.
#[derive(Clone, Debug, Default)]
pub(crate) enum NodeContext {
    #[default]
    None,
    /// Discontinuity settings used for the trigger of a `Choose` node.
    Choose(Arc<AadConfig>),
    /// Estimator re-applied to the upstream derivative.
    ConditionalExpectation(Arc<dyn ConditionalExpectationEstimator>),
}

/// Node of the operator tree.
pub struct OperatorNode {
    id: u64,
    operator: Option<OperatorType>,
    arguments: Vec<Option<Arc<OperatorNode>>>,
    argument_values: Vec<Option<Stochastic>>,
    context: NodeContext,
}

impl OperatorNode {
    /// Creates an independent leaf with a fresh id.
    pub(crate) fn leaf() -> Arc<Self> {
        Arc::new(Self {
            id: IdGenerator::global().next_id(),
            operator: None,
            arguments: Vec::new(),
            argument_values: Vec::new(),
            context: NodeContext::None,
        })
    }

    /// Records an operation with a fresh id.
    ///
    /// `arguments[i]` is `None` for a non-differentiable argument. All
    /// argument values are passed in; only the ones read by a partial
    /// derivative of a differentiable argument are kept.
    pub(crate) fn new(
        operator: OperatorType,
        arguments: Vec<Option<Arc<OperatorNode>>>,
        values: Vec<Stochastic>,
        context: NodeContext,
    ) -> Arc<Self> {
        debug_assert_eq!(arguments.len(), operator.arity());
        debug_assert_eq!(values.len(), operator.arity());

        let argument_values = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let read = arguments
                    .iter()
                    .enumerate()
                    .any(|(j, argument)| argument.is_some() && operator.reads(j).contains(&index));
                read.then_some(value)
            })
            .collect();

        Self::rehydrate(Some(operator), arguments, argument_values, context)
    }

    /// Builds a node from already-filtered parts, drawing a fresh id.
    pub(crate) fn rehydrate(
        operator: Option<OperatorType>,
        arguments: Vec<Option<Arc<OperatorNode>>>,
        argument_values: Vec<Option<Stochastic>>,
        context: NodeContext,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: IdGenerator::global().next_id(),
            operator,
            arguments,
            argument_values,
            context,
        })
    }

    /// Unique id, larger than the ids of all arguments.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Recorded operator; `None` for a leaf.
    #[inline]
    pub fn operator(&self) -> Option<OperatorType> {
        self.operator
    }

    /// Returns true for an independent variable.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.operator.is_none()
    }

    /// Argument nodes; `None` marks a non-differentiable argument.
    #[inline]
    pub fn arguments(&self) -> &[Option<Arc<OperatorNode>>] {
        &self.arguments
    }

    /// Retained argument values; `None` marks a value that was not kept.
    #[inline]
    pub fn argument_values(&self) -> &[Option<Stochastic>] {
        &self.argument_values
    }

    /// Ids of the argument nodes.
    pub fn argument_ids(&self) -> Vec<Option<u64>> {
        self.arguments
            .iter()
            .map(|argument| argument.as_ref().map(|node| node.id))
            .collect()
    }

    #[inline]
    pub(crate) fn context(&self) -> &NodeContext {
        &self.context
    }
}

impl fmt::Debug for OperatorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorNode")
            .field("id", &self.id)
            .field("operator", &self.operator)
            .field("arguments", &self.argument_ids())
            .finish()
    }
}

impl Drop for OperatorNode {
    // Long chains would otherwise drop recursively, one stack frame per node.
    fn drop(&mut self) {
        let mut pending: Vec<Arc<OperatorNode>> = self.arguments.drain(..).flatten().collect();
        while let Some(node) = pending.pop() {
            if let Some(mut node) = Arc::into_inner(node) {
                pending.extend(node.arguments.drain(..).flatten());
            }
        }
    }
}
