//! Benchmark for graph analysis and live parameter evaluation.
//!
//! Builds a synthetic shader graph (constant sources, layered math nodes,
//! audio-driven parameters and automation lanes) and times each stage.
//!
//! Run with: cargo run --release --bin bench_resolve

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::json;
use shadegraph_lib::models::automation::{AutomationCurve, AutomationLane, AutomationRegion};
use shadegraph_lib::node_graph::nodes::{MathOp, NodeTypeCatalog, VirtualSignalId};
use shadegraph_lib::node_graph::{
    detect_changes, evaluate_live_parameters, find_affected_nodes, topological_order,
    validate_graph, ChangeDetectionOptions, Edge, Graph, InputMode, NodeInstance,
};
use shadegraph_lib::{plan_compile, EngineConfig};

const LAYER_OPS: [MathOp; 4] = [MathOp::Add, MathOp::Multiply, MathOp::Mix, MathOp::Max];

fn generate_graph(width: usize, depth: usize) -> Graph {
    let mut nodes = Vec::with_capacity(width * (depth + 1) + 1);
    let mut edges = Vec::new();
    let mut lanes = Vec::new();

    nodes.push(NodeInstance::new("an", "audio-analyzer").with_param("bands", json!([80, 800, 8000])));

    for i in 0..width {
        nodes.push(
            NodeInstance::new(format!("src{i}"), "constant")
                .with_param("value", json!(i as f64 / width as f64))
                .at(0.0, i as f64 * 40.0),
        );
    }

    for layer in 0..depth {
        let op = LAYER_OPS[layer % LAYER_OPS.len()];
        for i in 0..width {
            let id = format!("n{layer}_{i}");
            let prev = |j: usize| {
                if layer == 0 {
                    format!("src{j}")
                } else {
                    format!("n{}_{j}", layer - 1)
                }
            };
            nodes.push(
                NodeInstance::new(&id, op.type_id()).at((layer + 1) as f64 * 200.0, i as f64 * 40.0),
            );
            edges.push(Edge::to_port(format!("{id}:a"), prev(i), "out", &id, "a"));
            edges.push(Edge::to_port(format!("{id}:b"), prev((i + 1) % width), "out", &id, "b"));

            if i % 8 == 0 && op == MathOp::Mix {
                let band = VirtualSignalId::format("an", &format!("band{}", i % 3));
                edges.push(Edge::to_param(format!("{id}:t"), band, "out", &id, "t"));
                if let Some(node) = nodes.last_mut() {
                    node.input_modes.insert("t".into(), InputMode::Multiply);
                }
            }
            if i % 16 == 0 {
                lanes.push(AutomationLane::new(
                    format!("lane:{id}"),
                    &id,
                    "a",
                    vec![
                        AutomationRegion::new(
                            "r",
                            0.0,
                            8.0,
                            AutomationCurve::linear(&[(0.0, 0.0), (1.0, 1.0)]),
                        )
                        .looping(),
                    ],
                ));
            }
        }
    }

    let mut graph = Graph {
        nodes,
        edges,
        ..Default::default()
    };
    graph.automation.lanes = lanes;
    graph
}

/// Per-stage timings, best and mean over the timed iterations.
struct Timings {
    iterations: usize,
    stages: Vec<(&'static str, Duration)>,
}

impl Timings {
    fn new(iterations: usize) -> Self {
        Self {
            iterations,
            stages: Vec::new(),
        }
    }

    /// Times `f`; `summarize` stages count toward the final breakdown.
    fn stage<R>(&mut self, name: &'static str, summarize: bool, mut f: impl FnMut() -> R) {
        std::hint::black_box(f());

        let mut best = Duration::MAX;
        let mut total = Duration::ZERO;
        for _ in 0..self.iterations {
            let start = Instant::now();
            std::hint::black_box(f());
            let took = start.elapsed();
            best = best.min(took);
            total += took;
        }
        let mean = total / self.iterations as u32;

        println!(
            "  {:<40} mean {:>8.3}ms  best {:>8.3}ms",
            name,
            mean.as_secs_f64() * 1000.0,
            best.as_secs_f64() * 1000.0,
        );
        if summarize {
            self.stages.push((name, mean));
        }
    }

    fn print_summary(&self) {
        let total: Duration = self.stages.iter().map(|(_, t)| *t).sum();
        for (name, t) in &self.stages {
            let pct = t.as_secs_f64() / total.as_secs_f64() * 100.0;
            println!(
                "  {:<40} {:>5.1}%  ({:.3}ms)",
                name,
                pct,
                t.as_secs_f64() * 1000.0
            );
        }
    }
}

fn main() {
    let (width, depth) = (64, 24);
    let graph = generate_graph(width, depth);
    println!(
        "Synthetic graph: {} nodes, {} edges, {} automation lanes\n",
        graph.nodes.len(),
        graph.edges.len(),
        graph.automation.lanes.len()
    );

    let registry = NodeTypeCatalog::builtin();
    let config = EngineConfig {
        log_summary: false,
        ..Default::default()
    };
    let live: HashMap<String, f64> = (0..3)
        .map(|b| (VirtualSignalId::format("an", &format!("band{b}")), 0.25 * (b + 1) as f64))
        .collect();

    let mut edited = graph.clone();
    if let Some(node) = edited.nodes.iter_mut().find(|n| n.id == "src3") {
        node.params.insert("value".into(), json!(0.9));
    }

    let iters = 50;
    let mut timings = Timings::new(iters);
    println!("=== Analysis ({iters} iterations each) ===\n");

    timings.stage("topological_order", true, || topological_order(&graph));
    timings.stage("find_affected_nodes (one source)", true, || {
        find_affected_nodes(&graph, ["src0"])
    });
    let options = ChangeDetectionOptions {
        track_affected_nodes: true,
    };
    timings.stage("detect_changes (one param edit)", true, || {
        detect_changes(Some(&graph), &edited, &options)
    });
    timings.stage("plan_compile (one param edit)", true, || {
        plan_compile(Some(&graph), &edited, &config)
    });
    timings.stage("validate_graph", false, || validate_graph(&graph, registry));

    println!("\n=== Live evaluation ({iters} iterations each) ===\n");

    timings.stage("evaluate_live_parameters", true, || {
        evaluate_live_parameters(&graph, registry, Some(&live), 3.5, &config)
    });

    println!("\n=== Summary ===\n");
    timings.print_summary();
}
