use std::collections::{HashMap, HashSet};

use super::dependency::DependencyGraph;
use super::nodes::{is_virtual_node_id, NodeTypeRegistry};
use crate::error::GraphIssue;
use crate::models::node_graph::{EdgeTarget, Graph};

/// Report every structural inconsistency in `graph`.
///
/// Intended for the editor's one-time validation pass; evaluation tolerates
/// all of these and resolves the affected values to `None`.
pub fn validate_graph(graph: &Graph, registry: &dyn NodeTypeRegistry) -> Vec<GraphIssue> {
    let mut issues = Vec::new();
    let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();

    for node in &graph.nodes {
        if registry.node_type(&node.type_id).is_none() {
            issues.push(GraphIssue::UnknownNodeType {
                node: node.id.clone(),
                type_id: node.type_id.clone(),
            });
        }
    }

    let mut bindings: Vec<((&str, EdgeTarget), Vec<String>)> = Vec::new();
    let mut binding_slots: HashMap<(&str, EdgeTarget), usize> = HashMap::new();

    for edge in &graph.edges {
        if !node_ids.contains(edge.from_node.as_str()) && !is_virtual_node_id(&edge.from_node) {
            issues.push(GraphIssue::MissingSource {
                edge: edge.id.clone(),
                node: edge.from_node.clone(),
            });
        }
        if edge.from_node == edge.to_node {
            issues.push(GraphIssue::SelfConnection {
                edge: edge.id.clone(),
                node: edge.to_node.clone(),
            });
        }

        let Some(target) = edge.target() else {
            issues.push(GraphIssue::MissingTargetSlot {
                edge: edge.id.clone(),
            });
            continue;
        };

        let key = (edge.to_node.as_str(), target);
        match binding_slots.get(&key) {
            Some(&slot) => bindings[slot].1.push(edge.id.clone()),
            None => {
                binding_slots.insert(key, bindings.len());
                bindings.push((key, vec![edge.id.clone()]));
            }
        }

        let Some(target_node) = graph.node(&edge.to_node) else {
            issues.push(GraphIssue::MissingTarget {
                edge: edge.id.clone(),
                node: edge.to_node.clone(),
            });
            continue;
        };
        let Some(node_type) = registry.node_type(&target_node.type_id) else {
            continue;
        };

        match target {
            EdgeTarget::Param(param) => match node_type.param(param) {
                None => issues.push(GraphIssue::UnknownParam {
                    edge: edge.id.clone(),
                    node: edge.to_node.clone(),
                    param: param.to_string(),
                }),
                Some(def) if !def.connectable => issues.push(GraphIssue::ParamNotConnectable {
                    edge: edge.id.clone(),
                    node: edge.to_node.clone(),
                    param: param.to_string(),
                }),
                Some(_) => {}
            },
            EdgeTarget::Port(port) => {
                if node_type.input(port).is_none() {
                    issues.push(GraphIssue::UnknownPort {
                        edge: edge.id.clone(),
                        node: edge.to_node.clone(),
                        port: port.to_string(),
                    });
                }
            }
        }
    }

    for ((node, target), edges) in bindings {
        if edges.len() < 2 {
            continue;
        }
        issues.push(match target {
            EdgeTarget::Param(param) => GraphIssue::DuplicateParamBinding {
                node: node.to_string(),
                param: param.to_string(),
                edges,
            },
            EdgeTarget::Port(port) => GraphIssue::DuplicatePortBinding {
                node: node.to_string(),
                port: port.to_string(),
                edges,
            },
        });
    }

    for nodes in DependencyGraph::build(graph).cycles() {
        issues.push(GraphIssue::Cycle { nodes });
    }

    if !issues.is_empty() {
        log::debug!("graph validation found {} issue(s)", issues.len());
    }
    issues
}
