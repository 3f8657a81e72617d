//! One step of the backward pass.

use std::collections::hash_map::Entry;

use super::{NodeContext, OperatorNode, OperatorType};
use crate::error::AadError;
use crate::gradient::GradientMap;

impl OperatorNode {
    /// Propagates this node's accumulated derivative to its differentiable arguments.
    ///
    /// For every argument node the contribution `partial × upstream` is added
    /// to the argument's entry in `gradient`, creating it on first
    /// contribution. The upstream derivative of a path reduction is first
    /// replaced by its average, that of a conditional expectation by its
    /// projection; for the trigger of a `Choose` the discontinuity policy may
    /// localise it.
    ///
    /// Does nothing for a leaf or a node without a gradient entry.
    ///
    /// # Errors
    ///
    /// Propagates [`AadError::InvalidArgument`] from [`OperatorNode::partial_derivative`].
    pub fn propagate_derivatives(&self, gradient: &mut GradientMap) -> Result<(), AadError> {
        let Some(operator) = self.operator else {
            return Ok(());
        };
        let Some(upstream) = gradient.get(&self.id).cloned() else {
            return Ok(());
        };

        let upstream = match &self.context {
            NodeContext::ConditionalExpectation(estimator) => {
                upstream.conditional_expectation(estimator)
            }
            _ if operator.averages_upstream() => upstream.average(),
            _ => upstream,
        };

        for (index, argument) in self.arguments.iter().enumerate() {
            let Some(argument) = argument else {
                continue;
            };

            let partial = self.partial_derivative(index)?;
            let effective = match (&self.context, operator, index) {
                (NodeContext::Choose(config), OperatorType::Choose, 0) => config
                    .discontinuity_policy()
                    .localize_upstream(config, self.value(0)?, &upstream),
                _ => upstream.clone(),
            };

            match gradient.entry(argument.id()) {
                Entry::Occupied(mut entry) => {
                    let accumulated = entry.get().add_product(&partial, &effective);
                    entry.insert(accumulated);
                }
                Entry::Vacant(entry) => {
                    entry.insert(effective.mult(&partial));
                }
            }
        }

        Ok(())
    }
}
