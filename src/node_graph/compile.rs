//! Decides how much work a newly published snapshot needs from the
//! code-generation backend.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::changes::{
    classify_automation_change, detect_changes, rebound_automation_targets, AutomationChange,
    ChangeDetectionOptions, ChangeKind, ChangeResult,
};
use super::dependency::DependencyGraph;
use crate::error::GraphError;
use crate::models::automation::AutomationState;
use crate::models::node_graph::{Graph, GraphSnapshot};
use crate::settings::EngineConfig;

static COMPILE_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(TS, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "compile.ts")]
pub enum CompileAction {
    /// Nothing changed.
    Skip,
    /// Only node positions moved; redraw the editor, keep the program.
    Relayout,
    /// Keep the program, re-evaluate automated uniforms.
    Reevaluate,
    /// Regenerate the program.
    Recompile,
}

#[derive(TS, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "compile.ts")]
#[ts(rename_all = "camelCase")]
pub struct CompilePlan {
    /// Assigned by [`CompileSession`]; 0 for standalone plans.
    pub revision: u64,
    pub action: CompileAction,
    pub change: ChangeResult,
    pub automation: AutomationChange,
    /// Present only when the plan recompiles.
    pub execution_order: Option<Vec<String>>,
    /// Nodes whose generated code or uniforms must be refreshed.
    pub dirty_nodes: BTreeSet<String>,
}

/// Plan the transition from `previous` to `next`. Fails only when a recompile
/// is needed and `next` has a dependency cycle.
pub fn plan_compile(
    previous: Option<&Graph>,
    next: &Graph,
    config: &EngineConfig,
) -> Result<CompilePlan, GraphError> {
    let run_id = COMPILE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let started = Instant::now();

    let options = ChangeDetectionOptions {
        track_affected_nodes: config.track_affected_nodes,
    };
    let change = detect_changes(previous, next, &options);

    let empty = AutomationState::default();
    let old_automation = previous.map(|g| &g.automation).unwrap_or(&empty);
    let automation = match previous {
        Some(prev) if std::ptr::eq(prev, next) => AutomationChange::Unchanged,
        _ => classify_automation_change(old_automation, &next.automation),
    };
    let rebound: BTreeSet<String> = if automation == AutomationChange::Lanes {
        rebound_automation_targets(old_automation, &next.automation)
            .into_iter()
            .map(|(node, _)| node)
            .filter(|node| next.node(node).is_some())
            .collect()
    } else {
        BTreeSet::new()
    };

    let action = if change.needs_recompile() || !rebound.is_empty() {
        CompileAction::Recompile
    } else if automation != AutomationChange::Unchanged {
        CompileAction::Reevaluate
    } else if change.kind == ChangeKind::PositionOnly {
        CompileAction::Relayout
    } else {
        CompileAction::Skip
    };

    let execution_order = match action {
        CompileAction::Recompile => match DependencyGraph::build(next).execution_order() {
            Ok(order) => Some(order),
            Err(err) => {
                log::warn!("[compile #{run_id}] aborted: {err}");
                return Err(err);
            }
        },
        _ => None,
    };

    let dirty_nodes = match action {
        CompileAction::Recompile => recompile_dirty_nodes(next, &change, &rebound, config),
        CompileAction::Reevaluate => changed_lane_nodes(old_automation, &next.automation),
        CompileAction::Relayout | CompileAction::Skip => BTreeSet::new(),
    };

    if config.log_summary {
        log::info!(
            "[compile #{run_id}] action={:?} kind={:?} automation={:?} nodes={} edges={} dirty={} ms={:.2}",
            action,
            change.kind,
            automation,
            next.nodes.len(),
            next.edges.len(),
            dirty_nodes.len(),
            started.elapsed().as_secs_f64() * 1000.0
        );
    }

    Ok(CompilePlan {
        revision: 0,
        action,
        change,
        automation,
        execution_order,
        dirty_nodes,
    })
}

fn recompile_dirty_nodes(
    next: &Graph,
    change: &ChangeResult,
    rebound: &BTreeSet<String>,
    config: &EngineConfig,
) -> BTreeSet<String> {
    if !config.track_affected_nodes {
        return next.nodes.iter().map(|n| n.id.clone()).collect();
    }
    let mut dirty = change.affected_nodes.clone().unwrap_or_default();
    if !rebound.is_empty() {
        dirty.extend(DependencyGraph::build(next).affected_nodes(rebound));
    }
    dirty
}

/// Nodes whose lanes differ between the two states, lanes matched by id.
fn changed_lane_nodes(old: &AutomationState, new: &AutomationState) -> BTreeSet<String> {
    let mut dirty = BTreeSet::new();
    for lane in &new.lanes {
        if old.lanes.iter().find(|l| l.id == lane.id) != Some(lane) {
            dirty.insert(lane.node_id.clone());
        }
    }
    for lane in &old.lanes {
        if !new.lanes.iter().any(|l| l.id == lane.id) {
            dirty.insert(lane.node_id.clone());
        }
    }
    dirty
}

/// The engine side of the publish sequence: holds the last accepted snapshot
/// and plans each new one against it.
#[derive(Debug, Default)]
pub struct CompileSession {
    config: EngineConfig,
    current: Option<GraphSnapshot>,
    revision: u64,
}

impl CompileSession {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            current: None,
            revision: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn current(&self) -> Option<&GraphSnapshot> {
        self.current.as_ref()
    }

    /// Revision of the current snapshot; 0 before the first publish.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Plan `next` against the current snapshot and make it current. On error
    /// the session keeps its previous snapshot and revision.
    pub fn publish(&mut self, next: GraphSnapshot) -> Result<CompilePlan, GraphError> {
        let mut plan = plan_compile(self.current.as_deref(), &next, &self.config)?;
        self.revision += 1;
        plan.revision = self.revision;
        self.current = Some(next);
        Ok(plan)
    }
}
