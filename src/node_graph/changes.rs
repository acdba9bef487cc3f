use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use super::dependency::DependencyGraph;
use crate::models::automation::{
    AutomationCurve, AutomationLane, AutomationRegion, AutomationState,
};
use crate::models::node_graph::{Graph, NodeInstance};

#[derive(TS, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "changes.ts")]
pub enum ChangeKind {
    None,
    PositionOnly,
    /// Nodes were added or removed.
    Structure,
    Connections,
    Parameters,
    NodeTypes,
    Mixed,
}

#[derive(Clone, Debug, Default)]
pub struct ChangeDetectionOptions {
    pub track_affected_nodes: bool,
}

#[derive(TS, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "changes.ts")]
#[ts(rename_all = "camelCase")]
pub struct ChangeResult {
    pub kind: ChangeKind,
    /// Nothing the engine evaluates differs; at most layout moved.
    pub is_only_position_change: bool,
    pub node_count_changed: bool,
    pub node_ids_changed: bool,
    pub node_types_changed: bool,
    pub parameters_changed: bool,
    pub connections_changed: bool,
    pub added_nodes: BTreeSet<String>,
    pub removed_nodes: BTreeSet<String>,
    /// Surviving nodes whose type, parameters or input modes changed.
    pub changed_nodes: BTreeSet<String>,
    pub added_connections: BTreeSet<String>,
    pub removed_connections: BTreeSet<String>,
    /// Downstream closure of the change, present when tracking was requested
    /// and something other than layout changed.
    pub affected_nodes: Option<BTreeSet<String>>,
}

impl ChangeResult {
    fn unchanged() -> Self {
        Self {
            kind: ChangeKind::None,
            is_only_position_change: true,
            node_count_changed: false,
            node_ids_changed: false,
            node_types_changed: false,
            parameters_changed: false,
            connections_changed: false,
            added_nodes: BTreeSet::new(),
            removed_nodes: BTreeSet::new(),
            changed_nodes: BTreeSet::new(),
            added_connections: BTreeSet::new(),
            removed_connections: BTreeSet::new(),
            affected_nodes: None,
        }
    }

    pub fn needs_recompile(&self) -> bool {
        !self.is_only_position_change
    }
}

/// Classify the difference between two snapshots.
///
/// Passing the same snapshot twice short-circuits on pointer identity, which
/// only holds if published snapshots are never mutated in place.
pub fn detect_changes(
    old: Option<&Graph>,
    new: &Graph,
    options: &ChangeDetectionOptions,
) -> ChangeResult {
    let Some(old) = old else {
        return first_compile(new, options);
    };
    if std::ptr::eq(old, new) {
        return ChangeResult::unchanged();
    }

    let old_nodes: HashMap<&str, &NodeInstance> =
        old.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
    let new_nodes: HashMap<&str, &NodeInstance> =
        new.nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    let added_nodes: BTreeSet<String> = new_nodes
        .keys()
        .filter(|id| !old_nodes.contains_key(*id))
        .map(|id| id.to_string())
        .collect();
    let removed_nodes: BTreeSet<String> = old_nodes
        .keys()
        .filter(|id| !new_nodes.contains_key(*id))
        .map(|id| id.to_string())
        .collect();

    let mut node_types_changed = false;
    let mut parameters_changed = false;
    let mut changed_nodes = BTreeSet::new();
    let mut moved = false;
    for (id, new_node) in &new_nodes {
        let Some(old_node) = old_nodes.get(id) else {
            continue;
        };
        let type_changed = old_node.type_id != new_node.type_id;
        let params_changed = !params_equal(&old_node.params, &new_node.params)
            || old_node.input_modes != new_node.input_modes;
        node_types_changed |= type_changed;
        parameters_changed |= params_changed;
        if type_changed || params_changed {
            changed_nodes.insert(id.to_string());
        }
        moved |= old_node.position_x != new_node.position_x
            || old_node.position_y != new_node.position_y;
    }

    let old_keys: HashMap<String, &str> = old
        .edges
        .iter()
        .map(|e| (e.canonical_key(), e.id.as_str()))
        .collect();
    let new_keys: HashMap<String, &str> = new
        .edges
        .iter()
        .map(|e| (e.canonical_key(), e.id.as_str()))
        .collect();
    let added_connections: BTreeSet<String> = new_keys
        .iter()
        .filter(|(key, _)| !old_keys.contains_key(*key))
        .map(|(_, id)| id.to_string())
        .collect();
    let removed_connections: BTreeSet<String> = old_keys
        .iter()
        .filter(|(key, _)| !new_keys.contains_key(*key))
        .map(|(_, id)| id.to_string())
        .collect();

    let node_count_changed = old.nodes.len() != new.nodes.len();
    let node_ids_changed = !added_nodes.is_empty() || !removed_nodes.is_empty();
    let connections_changed = !added_connections.is_empty() || !removed_connections.is_empty();
    let structure_changed = node_count_changed || node_ids_changed;

    let is_only_position_change =
        !(structure_changed || node_types_changed || parameters_changed || connections_changed);

    let flags = [
        (structure_changed, ChangeKind::Structure),
        (connections_changed, ChangeKind::Connections),
        (parameters_changed, ChangeKind::Parameters),
        (node_types_changed, ChangeKind::NodeTypes),
    ];
    let mut raised = flags.iter().filter(|(set, _)| *set).map(|(_, kind)| *kind);
    let kind = match (raised.next(), raised.next()) {
        (None, _) if moved => ChangeKind::PositionOnly,
        (None, _) => ChangeKind::None,
        (Some(kind), None) => kind,
        (Some(_), Some(_)) => ChangeKind::Mixed,
    };

    let mut result = ChangeResult {
        kind,
        is_only_position_change,
        node_count_changed,
        node_ids_changed,
        node_types_changed,
        parameters_changed,
        connections_changed,
        added_nodes,
        removed_nodes,
        changed_nodes,
        added_connections,
        removed_connections,
        affected_nodes: None,
    };

    if options.track_affected_nodes && !is_only_position_change {
        result.affected_nodes = Some(affected_by(old, new, &result));
    }
    result
}

fn first_compile(new: &Graph, options: &ChangeDetectionOptions) -> ChangeResult {
    let added_nodes: BTreeSet<String> = new.nodes.iter().map(|n| n.id.clone()).collect();
    ChangeResult {
        kind: ChangeKind::Structure,
        is_only_position_change: false,
        node_count_changed: true,
        node_ids_changed: true,
        node_types_changed: false,
        parameters_changed: false,
        connections_changed: !new.edges.is_empty(),
        affected_nodes: options.track_affected_nodes.then(|| added_nodes.clone()),
        added_nodes,
        removed_nodes: BTreeSet::new(),
        changed_nodes: BTreeSet::new(),
        added_connections: new.edges.iter().map(|e| e.id.clone()).collect(),
        removed_connections: BTreeSet::new(),
    }
}

/// Removed nodes are gone from `new`, so their former consumers are found by
/// walking the old snapshot; everything else propagates through `new`.
fn affected_by(old: &Graph, new: &Graph, change: &ChangeResult) -> BTreeSet<String> {
    let old_deps = DependencyGraph::build(old);
    let new_deps = DependencyGraph::build(new);

    let mut seeds: HashSet<String> = change
        .added_nodes
        .iter()
        .chain(&change.changed_nodes)
        .cloned()
        .collect();

    seeds.extend(
        old_deps
            .affected_nodes(&change.removed_nodes)
            .into_iter()
            .filter(|id| new_deps.contains(id)),
    );

    let touched_edges: HashSet<&str> = change
        .added_connections
        .iter()
        .chain(&change.removed_connections)
        .map(String::as_str)
        .collect();
    for edge in old.edges.iter().chain(&new.edges) {
        if touched_edges.contains(edge.id.as_str()) && new_deps.contains(&edge.to_node) {
            seeds.insert(edge.to_node.clone());
        }
    }

    new_deps.affected_nodes(&seeds).into_iter().collect()
}

/// Structural equality of parameter maps. Numbers compare by value, so `1`
/// and `1.0` are the same parameter value.
pub fn params_equal(a: &HashMap<String, Value>, b: &HashMap<String, Value>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| values_equal(value, other)))
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// How automation differs between two snapshots.
#[derive(TS, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "changes.ts")]
pub enum AutomationChange {
    Unchanged,
    /// Same lanes, regions and timing; keyframe data differs.
    CurvesOnly,
    /// Same lanes, regions and curves; start, duration or looping differs.
    TimingOnly,
    CurvesAndTiming,
    /// Lanes or regions were added, removed or rebound.
    Lanes,
}

pub fn classify_automation_change(old: &AutomationState, new: &AutomationState) -> AutomationChange {
    if std::ptr::eq(old, new) {
        return AutomationChange::Unchanged;
    }
    let Some(pairs) = paired_regions(old, new) else {
        return AutomationChange::Lanes;
    };
    let timing_same = pairs.iter().all(|(a, b)| a.same_timing(b));
    let curves_same = pairs.iter().all(|(a, b)| curves_equal(&a.curve, &b.curve));
    match (timing_same, curves_same) {
        (true, true) => AutomationChange::Unchanged,
        (true, false) => AutomationChange::CurvesOnly,
        (false, true) => AutomationChange::TimingOnly,
        (false, false) => AutomationChange::CurvesAndTiming,
    }
}

pub fn automation_equal(old: &AutomationState, new: &AutomationState) -> bool {
    classify_automation_change(old, new) == AutomationChange::Unchanged
}

pub fn automation_only_curves_differ(old: &AutomationState, new: &AutomationState) -> bool {
    classify_automation_change(old, new) == AutomationChange::CurvesOnly
}

pub fn automation_only_timing_differs(old: &AutomationState, new: &AutomationState) -> bool {
    classify_automation_change(old, new) == AutomationChange::TimingOnly
}

/// Node/parameter pairs bound in one state but not the other.
pub fn rebound_automation_targets(
    old: &AutomationState,
    new: &AutomationState,
) -> BTreeSet<(String, String)> {
    let keys = |state: &AutomationState| -> BTreeSet<(String, String)> {
        state
            .lanes
            .iter()
            .map(|l| (l.node_id.clone(), l.param_name.clone()))
            .collect()
    };
    let (old_keys, new_keys) = (keys(old), keys(new));
    old_keys.symmetric_difference(&new_keys).cloned().collect()
}

type RegionPair<'a> = (&'a AutomationRegion, &'a AutomationRegion);

/// Regions of both states matched lane by lane, or `None` when the lane or
/// region layout differs.
fn paired_regions<'a>(old: &'a AutomationState, new: &'a AutomationState) -> Option<Vec<RegionPair<'a>>> {
    if old.lanes.len() != new.lanes.len() {
        return None;
    }
    let sorted = |state: &'a AutomationState| -> Vec<&'a AutomationLane> {
        let mut lanes: Vec<&AutomationLane> = state.lanes.iter().collect();
        lanes.sort_by(|a, b| {
            (&a.node_id, &a.param_name, &a.id).cmp(&(&b.node_id, &b.param_name, &b.id))
        });
        lanes
    };

    let mut pairs = Vec::new();
    for (a, b) in sorted(old).into_iter().zip(sorted(new)) {
        if a.id != b.id
            || !a.binds(&b.node_id, &b.param_name)
            || a.regions.len() != b.regions.len()
        {
            return None;
        }
        for (ra, rb) in a.regions.iter().zip(&b.regions) {
            if ra.id != rb.id {
                return None;
            }
            pairs.push((ra, rb));
        }
    }
    Some(pairs)
}

/// Keyframe order is not significant; evaluation sorts by time.
fn curves_equal(a: &AutomationCurve, b: &AutomationCurve) -> bool {
    if a.interpolation != b.interpolation || a.keyframes.len() != b.keyframes.len() {
        return false;
    }
    // Same stable order evaluation uses: keys sharing a time keep their
    // authored order, which decides the value at that time.
    let sorted = |curve: &AutomationCurve| {
        let mut keys = curve.keyframes.clone();
        keys.sort_by(|x, y| x.time.total_cmp(&y.time));
        keys
    };
    sorted(a) == sorted(b)
}
