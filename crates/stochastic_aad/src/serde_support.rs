//! Serialization of differentiable values.
//!
//! A value is written as a flat arena of the nodes reachable from it, in
//! ascending id order, with arguments referenced by arena index. Ids are not
//! written: deserialization rebuilds the nodes in arena order with fresh ids
//! from the global generator, so a restored graph never collides with a live
//! one and keeps the "arguments precede dependents" ordering.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use stochastic_core::RandomVariable;

use crate::config::AadConfig;
use crate::error::AadError;
use crate::node::{NodeContext, OperatorNode, OperatorType};
use crate::value::{DifferentiableValue, Stochastic};

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ContextRepr {
    #[default]
    None,
    Choose(AadConfig),
}

impl ContextRepr {
    fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[derive(Serialize, Deserialize)]
struct NodeRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    operator: Option<OperatorType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    arguments: Vec<Option<usize>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    argument_values: Vec<Option<RandomVariable>>,
    #[serde(default, skip_serializing_if = "ContextRepr::is_none")]
    context: ContextRepr,
}

fn higher_order() -> AadError {
    AadError::UnsupportedOperation(
        "serialization of higher-order differentiable values is not supported".to_string(),
    )
}

fn plain(value: &Stochastic) -> Result<RandomVariable, AadError> {
    match value {
        Stochastic::Plain(values) => Ok(values.clone()),
        Stochastic::Differentiable(_) => Err(higher_order()),
    }
}

/// Nodes reachable from `root`, keyed and therefore ordered by id.
fn reachable(root: &OperatorNode) -> BTreeMap<u64, &OperatorNode> {
    let mut nodes = BTreeMap::new();
    let mut pending = vec![root];
    while let Some(node) = pending.pop() {
        if nodes.insert(node.id(), node).is_none() {
            pending.extend(node.arguments().iter().flatten().map(|argument| &**argument));
        }
    }
    nodes
}

fn capture(root: &OperatorNode) -> Result<(Vec<NodeRepr>, usize), AadError> {
    let nodes = reachable(root);
    let index: HashMap<u64, usize> = nodes
        .keys()
        .enumerate()
        .map(|(position, id)| (*id, position))
        .collect();

    let arena = nodes
        .values()
        .map(|node| {
            let context = match node.context() {
                NodeContext::None => ContextRepr::None,
                NodeContext::Choose(config) => ContextRepr::Choose(AadConfig::clone(config)),
                NodeContext::ConditionalExpectation(_) => {
                    return Err(AadError::UnsupportedOperation(format!(
                        "node {} holds a conditional expectation estimator, which cannot be serialized",
                        node.id()
                    )))
                }
            };
            let argument_values = node
                .argument_values()
                .iter()
                .map(|value| value.as_ref().map(plain).transpose())
                .collect::<Result<Vec<_>, _>>()?;
            Ok(NodeRepr {
                operator: node.operator(),
                arguments: node
                    .arguments()
                    .iter()
                    .map(|argument| argument.as_ref().map(|argument| index[&argument.id()]))
                    .collect(),
                argument_values,
                context,
            })
        })
        .collect::<Result<Vec<_>, AadError>>()?;

    Ok((arena, index[&root.id()]))
}

fn restore(arena: Vec<NodeRepr>) -> Result<Vec<Arc<OperatorNode>>, AadError> {
    let mut nodes: Vec<Arc<OperatorNode>> = Vec::with_capacity(arena.len());
    for (position, node) in arena.into_iter().enumerate() {
        let arity = node.operator.map_or(0, OperatorType::arity);
        if node.arguments.len() != arity || node.argument_values.len() != arity {
            return Err(AadError::InvalidArgument(format!(
                "node {position}: expected {arity} arguments and argument values, found {} and {}",
                node.arguments.len(),
                node.argument_values.len()
            )));
        }

        let arguments = node
            .arguments
            .into_iter()
            .map(|argument| match argument {
                None => Ok(None),
                Some(index) if index < position => Ok(Some(Arc::clone(&nodes[index]))),
                Some(index) => Err(AadError::InvalidArgument(format!(
                    "node {position} references node {index}, which does not precede it"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let argument_values = node
            .argument_values
            .into_iter()
            .map(|value| value.map(Stochastic::Plain))
            .collect();
        let context = match node.context {
            ContextRepr::None => NodeContext::None,
            ContextRepr::Choose(config) => NodeContext::Choose(Arc::new(config)),
        };

        nodes.push(OperatorNode::rehydrate(
            node.operator,
            arguments,
            argument_values,
            context,
        ));
    }
    Ok(nodes)
}

impl Serialize for DifferentiableValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values = plain(self.values()).map_err(serde::ser::Error::custom)?;
        let (nodes, root) = capture(self.node()).map_err(serde::ser::Error::custom)?;

        let mut s = serializer.serialize_struct("DifferentiableValue", 4)?;
        s.serialize_field("values", &values)?;
        s.serialize_field("nodes", &nodes)?;
        s.serialize_field("root", &root)?;
        s.serialize_field("config", self.config().as_ref())?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for DifferentiableValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct ValueData {
            values: RandomVariable,
            nodes: Vec<NodeRepr>,
            root: usize,
            #[serde(default)]
            config: AadConfig,
        }

        let data = ValueData::deserialize(deserializer)?;
        let nodes = restore(data.nodes).map_err(serde::de::Error::custom)?;
        let root = nodes.get(data.root).cloned().ok_or_else(|| {
            serde::de::Error::custom(format!(
                "root index {} out of range for {} nodes",
                data.root,
                nodes.len()
            ))
        })?;

        Ok(DifferentiableValue::from_parts(
            Stochastic::Plain(data.values),
            root,
            Arc::new(data.config),
        ))
    }
}
