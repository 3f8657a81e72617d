//! Backward traversal of an operator tree.
//!
//! [`compute_gradient`] turns a root node into a map from node id to the
//! accumulated derivative of the root with respect to that node. Nodes are
//! processed in strictly decreasing id order: every dependant of a node has a
//! larger id, so all contributions to a node are accumulated before it
//! propagates further backward.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::AadConfig;
use crate::error::AadError;
use crate::node::OperatorNode;
use crate::value::Stochastic;

/// Map from node id to the derivative of the root with respect to that node.
pub type GradientMap = HashMap<u64, Stochastic>;

/// Computes the gradient of `root` with respect to the nodes it depends on.
///
/// The map is seeded with `{root → 1}`. In leaf-retention mode
/// ([`AadConfig::retain_leaves_only`]) the entry of an operator node is
/// removed once it has propagated, so the result holds only independent
/// leaves. With `filter`, the result holds exactly the filtered ids that were
/// reached, and traversal stops once all of them are recorded.
///
/// # Errors
///
/// Returns [`AadError::InvalidArgument`] if a node needs an argument value it
/// did not retain, which indicates a corrupted graph.
///
/// # Examples
///
/// ```
/// use stochastic_aad::AadFactory;
///
/// let factory = AadFactory::default();
/// let x = factory.scalar(3.0);
/// let y = x.squared();
///
/// let gradient = y.gradient(None).unwrap();
/// assert_eq!(gradient[&x.id()].random_variable().get(0), 6.0);
/// ```
pub fn compute_gradient(
    root: &Arc<OperatorNode>,
    config: &AadConfig,
    filter: Option<&HashSet<u64>>,
) -> Result<GradientMap, AadError> {
    let retain_leaves_only = config.retain_leaves_only();

    let mut gradient = GradientMap::new();
    gradient.insert(root.id(), Stochastic::one());

    let mut frontier: BTreeMap<u64, Arc<OperatorNode>> = BTreeMap::new();
    frontier.insert(root.id(), Arc::clone(root));

    let mut recorded = GradientMap::new();
    let mut processed = 0usize;

    debug!(
        root = root.id(),
        filtered = filter.map(HashSet::len),
        "starting backward pass"
    );

    while let Some((id, node)) = frontier.pop_last() {
        trace!(id, operator = ?node.operator(), "propagating");
        node.propagate_derivatives(&mut gradient)?;
        processed += 1;

        for argument in node.arguments().iter().flatten() {
            frontier
                .entry(argument.id())
                .or_insert_with(|| Arc::clone(argument));
        }

        if let Some(filter) = filter.filter(|filter| filter.contains(&id)) {
            if let Some(derivative) = gradient.remove(&id) {
                recorded.insert(id, derivative);
            }
            if recorded.len() == filter.len() {
                break;
            }
        } else if retain_leaves_only && !node.is_leaf() {
            gradient.remove(&id);
        }
    }

    let result = match filter {
        Some(_) => recorded,
        None => gradient,
    };

    debug!(
        root = root.id(),
        processed,
        entries = result.len(),
        "backward pass complete"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::AadFactory;
    use approx::assert_relative_eq;

    fn value_of(gradient: &GradientMap, id: u64) -> f64 {
        gradient[&id].random_variable().get(0)
    }

    #[test]
    fn test_leaf_root_has_unit_gradient() {
        let factory = AadFactory::default();
        let x = factory.scalar(5.0);

        let gradient = x.gradient(None).unwrap();
        assert_eq!(gradient.len(), 1);
        assert_eq!(value_of(&gradient, x.id()), 1.0);
    }

    #[test]
    fn test_shared_subexpression_accumulates() {
        let factory = AadFactory::default();
        let x = factory.scalar(2.0);

        // u = x * x, f = u + u * x
        let u = x.mult(&x);
        let f = u.add(&u.mult(&x));

        let gradient = f.gradient(None).unwrap();
        // f = x² + x³, f' = 2x + 3x² = 16
        assert_relative_eq!(value_of(&gradient, x.id()), 16.0, epsilon = 1e-12);
        assert_eq!(gradient.len(), 1);
    }

    #[test]
    fn test_leaf_retention_off_keeps_intermediates() {
        let config = AadConfig::builder()
            .retain_leaves_only(false)
            .build()
            .unwrap();
        let factory = AadFactory::new(config);
        let x = factory.scalar(2.0);
        let u = x.exp();
        let f = u.squared();

        let gradient = f.gradient(None).unwrap();
        assert_eq!(gradient.len(), 3);
        assert_eq!(value_of(&gradient, f.id()), 1.0);
        assert_relative_eq!(
            value_of(&gradient, u.id()),
            2.0 * 2.0f64.exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_filter_returns_only_filtered_ids() {
        let factory = AadFactory::default();
        let x = factory.scalar(2.0);
        let y = factory.scalar(3.0);
        let f = x.mult(&y).add(&y);

        let filter: HashSet<u64> = [y.id()].into_iter().collect();
        let gradient = f.gradient(Some(&filter)).unwrap();

        assert_eq!(gradient.len(), 1);
        assert_relative_eq!(value_of(&gradient, y.id()), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_filter_on_intermediate_node() {
        let factory = AadFactory::default();
        let x = factory.scalar(2.0);
        let u = x.squared();
        let f = u.mult(&3.0);

        let filter: HashSet<u64> = [u.id(), x.id()].into_iter().collect();
        let gradient = f.gradient(Some(&filter)).unwrap();

        assert_eq!(gradient.len(), 2);
        assert_relative_eq!(value_of(&gradient, u.id()), 3.0, epsilon = 1e-12);
        assert_relative_eq!(value_of(&gradient, x.id()), 12.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unreached_filter_id_is_absent() {
        let factory = AadFactory::default();
        let x = factory.scalar(2.0);
        let other = factory.scalar(7.0);
        let f = x.exp();

        let filter: HashSet<u64> = [other.id()].into_iter().collect();
        let gradient = f.gradient(Some(&filter)).unwrap();
        assert!(gradient.is_empty());
    }
}
