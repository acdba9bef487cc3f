use super::nodes::{NodeTypeCatalog, NodeTypeRegistry};
use super::{
    build_dependents_graph, compute_effective_value, detect_changes, evaluate_live_parameters,
    find_affected_nodes, has_trackable_input, topological_order, ChangeDetectionOptions,
    ChangeKind, Edge, Graph, InputMode, NodeInstance, ParamDef, SignalContext,
};
use crate::settings::EngineConfig;
use serde_json::json;
use std::collections::HashMap;

fn tracked() -> ChangeDetectionOptions {
    ChangeDetectionOptions {
        track_affected_nodes: true,
    }
}

fn value_def() -> ParamDef {
    ParamDef::number("value", "Value", 0.0)
}

/// `c2` and `c3` feed an `add` node whose output modulates `target.value`.
fn add_chain(target_base: f64, mode: InputMode) -> Graph {
    Graph {
        nodes: vec![
            NodeInstance::new("c2", "constant").with_param("value", json!(2.0)),
            NodeInstance::new("c3", "constant").with_param("value", json!(3.0)),
            NodeInstance::new("sum", "add"),
            NodeInstance::new("target", "constant")
                .with_param("value", json!(target_base))
                .with_input_mode("value", mode),
        ],
        edges: vec![
            Edge::to_port("e1", "c2", "out", "sum", "a"),
            Edge::to_port("e2", "c3", "out", "sum", "b"),
            Edge::to_param("e3", "sum", "out", "target", "value"),
        ],
        ..Default::default()
    }
}

#[test]
fn add_chain_combines_in_add_mode() {
    let graph = add_chain(1.0, InputMode::Add);
    let target = graph.node("target").unwrap();
    let value = compute_effective_value(
        target,
        "value",
        &value_def(),
        &graph,
        NodeTypeCatalog::builtin(),
        None,
        None,
    );
    assert_eq!(value, Some(6.0));
}

#[test]
fn combination_mode_falls_back_to_param_default_then_override() {
    let mut graph = add_chain(1.0, InputMode::Add);
    graph.nodes[3].input_modes.clear();
    let registry = NodeTypeCatalog::builtin();
    let ctx = SignalContext::new(&graph, registry);
    let target = graph.node("target").unwrap();

    assert_eq!(
        ctx.compute_effective_value(target, "value", &value_def(), None),
        Some(5.0)
    );
    let subtracting = value_def().with_input_mode(InputMode::Subtract);
    assert_eq!(
        ctx.compute_effective_value(target, "value", &subtracting, None),
        Some(-4.0)
    );
}

#[test]
fn automation_replaces_base_but_not_connection() {
    let graph = add_chain(1.0, InputMode::Multiply);
    let ctx = SignalContext::new(&graph, NodeTypeCatalog::builtin());
    let target = graph.node("target").unwrap();
    assert_eq!(
        ctx.compute_effective_value(target, "value", &value_def(), Some(0.5)),
        Some(2.5)
    );

    let lone = NodeInstance::new("lone", "constant").with_param("value", json!(7.0));
    assert_eq!(
        ctx.compute_effective_value(&lone, "value", &value_def(), Some(0.5)),
        Some(0.5)
    );
}

#[test]
fn audio_signal_multiplies_base_value() {
    let graph = Graph {
        nodes: vec![
            NodeInstance::new("an", "audio-analyzer").with_param("bands", json!([80.0, 2000.0])),
            NodeInstance::new("target", "constant")
                .with_param("value", json!(1.0))
                .with_input_mode("value", InputMode::Multiply),
        ],
        edges: vec![Edge::to_param(
            "e1",
            "virtual:an:band0",
            "out",
            "target",
            "value",
        )],
        ..Default::default()
    };
    let live: HashMap<String, f64> = HashMap::from([("virtual:an:band0".to_string(), 0.4)]);
    let target = graph.node("target").unwrap();

    let value = compute_effective_value(
        target,
        "value",
        &value_def(),
        &graph,
        NodeTypeCatalog::builtin(),
        Some(&live),
        None,
    );
    assert_eq!(value, Some(0.4));

    // Without a provider the chain is unresolvable.
    let value = compute_effective_value(
        target,
        "value",
        &value_def(),
        &graph,
        NodeTypeCatalog::builtin(),
        None,
        None,
    );
    assert_eq!(value, None);
}

#[test]
fn unconnected_param_round_trips_stored_or_default() {
    let graph = Graph::default();
    let registry = NodeTypeCatalog::builtin();
    let def = ParamDef::number("gain", "Gain", 0.75);

    let stored = NodeInstance::new("n", "constant").with_param("gain", json!(0.2));
    assert_eq!(
        compute_effective_value(&stored, "gain", &def, &graph, registry, None, None),
        Some(0.2)
    );

    let text = NodeInstance::new("n", "constant").with_param("gain", json!("loud"));
    assert_eq!(
        compute_effective_value(&text, "gain", &def, &graph, registry, None, None),
        Some(0.75)
    );

    let unset = NodeInstance::new("n", "constant");
    assert_eq!(
        compute_effective_value(&unset, "gain", &def, &graph, registry, None, None),
        Some(0.75)
    );
}

#[test]
fn unconnected_math_ports_read_fallback_params() {
    // multiply(a = 4 from its own param, b = connected 0.5)
    let graph = Graph {
        nodes: vec![
            NodeInstance::new("half", "constant").with_param("value", json!(0.5)),
            NodeInstance::new("mul", "multiply").with_param("a", json!(4.0)),
            NodeInstance::new("target", "constant"),
        ],
        edges: vec![
            Edge::to_port("e1", "half", "out", "mul", "b"),
            Edge::to_param("e2", "mul", "out", "target", "value"),
        ],
        ..Default::default()
    };
    let ctx = SignalContext::new(&graph, NodeTypeCatalog::builtin());
    assert_eq!(ctx.resolve_source("mul", 0), Some(2.0));
}

#[test]
fn trackable_input_mirrors_resolution() {
    let live: HashMap<String, f64> = HashMap::from([("virtual:an:band1".to_string(), 0.9)]);
    let registry = NodeTypeCatalog::builtin();

    // (source node, source type, source params, live provider?)
    let cases: Vec<(&str, &str, serde_json::Value, bool)> = vec![
        ("src", "constant", json!({ "value": 0.3 }), false),
        ("src", "sqrt", json!({ "x": 9.0 }), false),
        ("src", "sqrt", json!({ "x": -1.0 }), false),
        ("src", "divide", json!({ "a": 1.0, "b": 0.0 }), false),
        ("src", "asin", json!({ "x": 2.0 }), false),
        ("src", "audio-analyzer", json!({ "bands": [60.0] }), false),
        ("src", "circle", json!({}), false),
        ("virtual:an:band1", "", json!({}), false),
        ("virtual:an:band1", "", json!({}), true),
        ("virtual:an:band7", "", json!({}), true),
        ("missing", "", json!({}), false),
    ];

    for (source, type_id, params, with_live) in cases {
        let mut nodes = vec![NodeInstance::new("target", "constant")];
        if !type_id.is_empty() {
            let mut node = NodeInstance::new(source, type_id);
            if let serde_json::Value::Object(map) = params {
                node.params = map.into_iter().collect();
            }
            nodes.push(node);
        }
        let graph = Graph {
            nodes,
            edges: vec![Edge::to_param("e", source, "out", "target", "value")],
            ..Default::default()
        };
        let provider: Option<&dyn super::nodes::LiveSignalSource> =
            if with_live { Some(&live) } else { None };
        let target = graph.node("target").unwrap();

        let value = compute_effective_value(
            target,
            "value",
            &value_def(),
            &graph,
            registry,
            provider,
            None,
        );
        let trackable = has_trackable_input(target, "value", &graph, registry, provider);
        assert_eq!(
            trackable,
            value.is_some(),
            "{source} ({type_id}) live={with_live}"
        );
    }
}

#[test]
fn identical_snapshot_reports_nothing() {
    let graph = add_chain(1.0, InputMode::Add);
    let result = detect_changes(Some(&graph), &graph, &tracked());
    assert_eq!(result.kind, ChangeKind::None);
    assert!(result.is_only_position_change);
    assert!(result.added_nodes.is_empty());
    assert!(result.removed_nodes.is_empty());
    assert!(result.changed_nodes.is_empty());
    assert!(result.affected_nodes.is_none());
}

#[test]
fn fresh_copy_with_moved_nodes_is_position_only() {
    let old = add_chain(1.0, InputMode::Add);

    let copy = old.clone();
    let result = detect_changes(Some(&old), &copy, &tracked());
    assert_eq!(result.kind, ChangeKind::None);
    assert!(result.is_only_position_change);

    let mut moved = old.clone();
    moved.nodes[2] = moved.nodes[2].clone().at(300.0, 120.0);
    moved.edges.reverse();
    let result = detect_changes(Some(&old), &moved, &tracked());
    assert_eq!(result.kind, ChangeKind::PositionOnly);
    assert!(result.is_only_position_change);
    assert!(!result.connections_changed);
}

#[test]
fn integer_and_float_params_compare_equal() {
    let old = Graph {
        nodes: vec![NodeInstance::new("n", "constant").with_param("value", json!({ "xs": [1, 2] }))],
        ..Default::default()
    };
    let new = Graph {
        nodes: vec![
            NodeInstance::new("n", "constant").with_param("value", json!({ "xs": [1.0, 2.0] })),
        ],
        ..Default::default()
    };
    assert!(detect_changes(Some(&old), &new, &tracked()).is_only_position_change);
}

#[test]
fn removed_node_flags_former_consumers() {
    let old = Graph {
        nodes: vec![
            NodeInstance::new("a", "constant"),
            NodeInstance::new("b", "negate"),
            NodeInstance::new("c", "negate"),
            NodeInstance::new("d", "negate"),
        ],
        edges: vec![
            Edge::to_port("ab", "a", "out", "b", "x"),
            Edge::to_port("bc", "b", "out", "c", "x"),
            Edge::to_port("cd", "c", "out", "d", "x"),
        ],
        ..Default::default()
    };
    let new = Graph {
        nodes: vec![
            NodeInstance::new("a", "constant"),
            NodeInstance::new("c", "negate"),
            NodeInstance::new("d", "negate"),
        ],
        edges: vec![Edge::to_port("cd", "c", "out", "d", "x")],
        ..Default::default()
    };

    let dependents = build_dependents_graph(&old);
    assert!(dependents["b"].contains("c"));

    let result = detect_changes(Some(&old), &new, &tracked());
    assert_eq!(result.kind, ChangeKind::Mixed);
    assert!(result.removed_nodes.contains("b"));
    let affected = result.affected_nodes.unwrap();
    assert!(affected.contains("c"));
    assert!(affected.contains("d"));
    assert!(!affected.contains("a"));
    assert!(!affected.contains("b"));
}

#[test]
fn first_compile_lists_everything_as_added() {
    let graph = add_chain(1.0, InputMode::Add);
    let result = detect_changes(None, &graph, &tracked());
    assert_eq!(result.kind, ChangeKind::Structure);
    assert_eq!(result.added_nodes.len(), 4);
    assert_eq!(result.added_connections.len(), 3);

    let order = topological_order(&graph).unwrap();
    assert_eq!(order, vec!["c2", "c3", "sum", "target"]);
    let affected = find_affected_nodes(&graph, ["c3"]);
    assert_eq!(affected.len(), 3);
}

#[test]
fn graph_deserializes_from_editor_json() {
    let graph: Graph = serde_json::from_value(json!({
        "nodes": [
            { "id": "k", "typeId": "constant", "params": { "value": 0.0 } },
            {
                "id": "sum",
                "typeId": "add",
                "params": { "b": 2 },
                "inputModes": { "a": "add" },
                "positionX": 10.0,
                "positionY": 20.0
            }
        ],
        "edges": [
            { "id": "e1", "fromNode": "k", "fromPort": "out", "toNode": "sum", "toPort": "a" }
        ],
        "automation": {
            "lanes": [{
                "id": "l1",
                "nodeId": "k",
                "paramName": "value",
                "regions": [{
                    "id": "r1",
                    "startTime": 0.0,
                    "duration": 10.0,
                    "loop": true,
                    "curve": {
                        "interpolation": "linear",
                        "keyframes": [{ "time": 0.0, "value": 0.0 }, { "time": 1.0, "value": 1.0 }]
                    }
                }]
            }]
        }
    }))
    .unwrap();

    assert_eq!(graph.nodes[1].input_modes["a"], InputMode::Add);
    assert!(graph.automation.lanes[0].regions[0].looped);

    let values = evaluate_live_parameters(
        &graph,
        NodeTypeCatalog::builtin(),
        None,
        5.0,
        &EngineConfig::default(),
    );
    assert_eq!(values[&("k".to_string(), "value".to_string())], 0.5);
    assert_eq!(values[&("sum".to_string(), "b".to_string())], 2.0);
    assert_eq!(values[&("sum".to_string(), "a".to_string())], 0.0);
}

#[test]
fn live_parameters_skip_unknown_node_types() {
    let graph = Graph {
        nodes: vec![
            NodeInstance::new("mystery", "not-a-node"),
            NodeInstance::new("k", "constant").with_param("value", json!(3.0)),
        ],
        ..Default::default()
    };
    let registry = NodeTypeCatalog::builtin();
    assert!(registry.node_type("not-a-node").is_none());

    let values = evaluate_live_parameters(&graph, registry, None, 0.0, &EngineConfig::default());
    assert_eq!(values.len(), 1);
    assert_eq!(values[&("k".to_string(), "value".to_string())], 3.0);
}
