//! Live parameter values for the editor and for driving uniforms.
//!
//! A parameter's effective value is its configured value (automation if
//! active, else the stored value, else the declared default) combined with the
//! value arriving over a connection, if any. Upstream values are computed by
//! walking simple value-producing nodes directly, without running the compiled
//! program. Anything the walk cannot evaluate is `None`, never an error.

use std::collections::HashMap;

use rayon::prelude::*;

use super::nodes::{is_virtual_node_id, EvalKind, LiveSignalSource, NodeTypeRegistry};
use crate::automation::evaluate_automation_for_node;
use crate::models::node_graph::{
    Edge, EdgeTarget, Graph, InputMode, NodeInstance, ParamDef, ParamType,
};
use crate::settings::{EngineConfig, DEFAULT_MAX_RESOLVE_DEPTH};

/// Shared, read-only inputs for resolving many parameters of one snapshot.
pub struct SignalContext<'a> {
    graph: &'a Graph,
    registry: &'a dyn NodeTypeRegistry,
    live: Option<&'a dyn LiveSignalSource>,
    max_depth: usize,
    nodes_by_id: HashMap<&'a str, &'a NodeInstance>,
    /// Connections into each node, in declaration order.
    incoming: HashMap<&'a str, Vec<(EdgeTarget<'a>, &'a Edge)>>,
}

impl<'a> SignalContext<'a> {
    pub fn new(graph: &'a Graph, registry: &'a dyn NodeTypeRegistry) -> Self {
        let nodes_by_id = graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

        let mut incoming: HashMap<&'a str, Vec<(EdgeTarget<'a>, &'a Edge)>> = HashMap::new();
        for edge in &graph.edges {
            if let Some(target) = edge.target() {
                incoming
                    .entry(edge.to_node.as_str())
                    .or_default()
                    .push((target, edge));
            }
        }

        Self {
            graph,
            registry,
            live: None,
            max_depth: DEFAULT_MAX_RESOLVE_DEPTH,
            nodes_by_id,
            incoming,
        }
    }

    pub fn with_live_source(mut self, live: Option<&'a dyn LiveSignalSource>) -> Self {
        self.live = live;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn graph(&self) -> &'a Graph {
        self.graph
    }

    /// First connection into `node_id` landing on `target`.
    fn binding(&self, node_id: &str, target: EdgeTarget<'_>) -> Option<&'a Edge> {
        self.incoming
            .get(node_id)?
            .iter()
            .find(|(t, _)| *t == target)
            .map(|(_, edge)| *edge)
    }

    /// Connection modulating `(node_id, param_name)`, if any.
    pub fn param_binding(&self, node_id: &str, param_name: &str) -> Option<&'a Edge> {
        self.binding(node_id, EdgeTarget::Param(param_name))
    }

    fn port_binding(&self, node_id: &str, port: &str) -> Option<&'a Edge> {
        self.binding(node_id, EdgeTarget::Port(port))
    }

    /// Effective value of one parameter.
    ///
    /// `automation_value` replaces the stored value when present but still
    /// combines with a connection. `None` when the parameter has no numeric
    /// value or its connection cannot be resolved; callers then fall back to
    /// the static value.
    pub fn compute_effective_value(
        &self,
        node: &NodeInstance,
        param_name: &str,
        param_def: &ParamDef,
        automation_value: Option<f64>,
    ) -> Option<f64> {
        let base = node.number_param(param_name).or(param_def.default_number);
        let configured = automation_value.or(base);

        let value = match self.param_binding(&node.id, param_name) {
            None => configured?,
            Some(edge) => {
                let upstream = self.resolve_source(&edge.from_node, 0)?;
                let mode = node
                    .input_modes
                    .get(param_name)
                    .copied()
                    .or(param_def.input_mode)
                    .unwrap_or_default();
                match mode {
                    InputMode::Override => upstream,
                    mode => mode.combine(configured?, upstream),
                }
            }
        };

        if param_def.param_type == ParamType::Int {
            Some(value.round())
        } else {
            Some(value)
        }
    }

    /// Whether a parameter's connection chain resolves to a live value. Goes
    /// through the same walk as [`Self::compute_effective_value`], so the two
    /// cannot disagree.
    pub fn has_trackable_input(&self, node_id: &str, param_name: &str) -> bool {
        self.param_binding(node_id, param_name)
            .is_some_and(|edge| self.resolve_source(&edge.from_node, 0).is_some())
    }

    /// Value produced by the node (or virtual signal) `source_id`, `depth`
    /// hops away from the parameter being resolved.
    pub fn resolve_source(&self, source_id: &str, depth: usize) -> Option<f64> {
        if depth > self.max_depth {
            log::trace!("resolve depth exceeded at '{source_id}'");
            return None;
        }

        let Some(node) = self.nodes_by_id.get(source_id).copied() else {
            if is_virtual_node_id(source_id) {
                return self.live?.live_value(source_id).filter(|v| v.is_finite());
            }
            return None;
        };

        match EvalKind::from_type_id(&node.type_id)? {
            EvalKind::Constant => node.number_param("value").or_else(|| {
                self.param_default(node, "value")
            }),
            EvalKind::Math(op) => {
                let mut args = Vec::with_capacity(op.inputs().len());
                for spec in op.inputs() {
                    let value = match self.port_binding(&node.id, spec.port) {
                        Some(edge) => self.resolve_source(&edge.from_node, depth + 1)?,
                        None => self.port_fallback(node, spec.port, spec.default)?,
                    };
                    args.push(value);
                }
                op.apply(&args)
            }
        }
    }

    /// Unconnected port: the node's own fallback parameter, or its default.
    fn port_fallback(&self, node: &NodeInstance, port: &str, builtin_default: f64) -> Option<f64> {
        let node_type = self.registry.node_type(&node.type_id);
        let param = match node_type.and_then(|t| t.input(port)) {
            Some(port_def) => port_def.fallback_param.as_deref()?,
            None => port,
        };
        node.number_param(param)
            .or_else(|| node_type.and_then(|t| t.param(param)).and_then(|p| p.default_number))
            .or(Some(builtin_default))
    }

    fn param_default(&self, node: &NodeInstance, param: &str) -> Option<f64> {
        self.registry
            .node_type(&node.type_id)?
            .param(param)?
            .default_number
    }

    /// Effective values of every numeric parameter of `node` at time `t`.
    pub fn node_values(&self, node: &NodeInstance, t: f64) -> Vec<((String, String), f64)> {
        let Some(node_type) = self.registry.node_type(&node.type_id) else {
            return Vec::new();
        };
        let automated = evaluate_automation_for_node(&self.graph.automation, &node.id, node_type, t);
        node_type
            .params
            .iter()
            .filter(|def| def.is_numeric())
            .filter_map(|def| {
                let automation = automated.get(&def.id).copied();
                self.compute_effective_value(node, &def.id, def, automation)
                    .map(|value| ((node.id.clone(), def.id.clone()), value))
            })
            .collect()
    }
}

/// Single-parameter form of [`SignalContext::compute_effective_value`].
pub fn compute_effective_value(
    node: &NodeInstance,
    param_name: &str,
    param_def: &ParamDef,
    graph: &Graph,
    registry: &dyn NodeTypeRegistry,
    live: Option<&dyn LiveSignalSource>,
    automation_value: Option<f64>,
) -> Option<f64> {
    SignalContext::new(graph, registry)
        .with_live_source(live)
        .compute_effective_value(node, param_name, param_def, automation_value)
}

pub fn has_trackable_input(
    node: &NodeInstance,
    param_name: &str,
    graph: &Graph,
    registry: &dyn NodeTypeRegistry,
    live: Option<&dyn LiveSignalSource>,
) -> bool {
    SignalContext::new(graph, registry)
        .with_live_source(live)
        .has_trackable_input(&node.id, param_name)
}

/// Effective value of every numeric parameter in the graph at transport time
/// `t`, keyed by `(node_id, param_id)`. Nodes are evaluated in parallel.
pub fn evaluate_live_parameters(
    graph: &Graph,
    registry: &dyn NodeTypeRegistry,
    live: Option<&dyn LiveSignalSource>,
    t: f64,
    config: &EngineConfig,
) -> HashMap<(String, String), f64> {
    let ctx = SignalContext::new(graph, registry)
        .with_live_source(live)
        .with_max_depth(config.max_resolve_depth);

    graph
        .nodes
        .par_iter()
        .flat_map_iter(|node| ctx.node_values(node, t))
        .collect()
}
