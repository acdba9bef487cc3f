mod changes;
mod compile;
mod dependency;
mod signals;
mod validate;

pub mod nodes;

pub use crate::models::node_graph::*;
pub use changes::{
    automation_equal, automation_only_curves_differ, automation_only_timing_differs,
    classify_automation_change, detect_changes, params_equal, rebound_automation_targets,
    values_equal, AutomationChange, ChangeDetectionOptions, ChangeKind, ChangeResult,
};
pub use compile::{plan_compile, CompileAction, CompilePlan, CompileSession};
pub use dependency::{
    build_dependents_graph, find_affected_nodes, topological_order, DependencyGraph,
};
pub use signals::{
    compute_effective_value, evaluate_live_parameters, has_trackable_input, SignalContext,
};
pub use validate::validate_graph;

#[cfg(test)]
mod tests;
