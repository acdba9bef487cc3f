//! Dependency analysis over a graph snapshot.
//!
//! Every connection is a `source -> target` dependency, whether it lands on an
//! input port or modulates a parameter. Virtual signal nodes become vertices
//! when a connection reads from them, hanging off their owner node when it
//! exists, but they never appear in execution orders or affected sets.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use super::nodes::{is_virtual_node_id, VirtualSignalId};
use crate::error::GraphError;
use crate::models::node_graph::Graph;

pub struct DependencyGraph<'a> {
    graph: DiGraph<&'a str, &'a str>,
    indices: HashMap<&'a str, NodeIndex>,
    /// Real nodes occupy indices `0..real_nodes`, in declaration order.
    real_nodes: usize,
}

impl<'a> DependencyGraph<'a> {
    pub fn build(source: &'a Graph) -> Self {
        let mut graph: DiGraph<&'a str, &'a str> = DiGraph::new();
        let mut indices = HashMap::new();

        for node in &source.nodes {
            if indices.contains_key(node.id.as_str()) {
                log::warn!("duplicate node id '{}' ignored for ordering", node.id);
                continue;
            }
            let idx = graph.add_node(node.id.as_str());
            indices.insert(node.id.as_str(), idx);
        }
        let real_nodes = graph.node_count();

        for edge in &source.edges {
            let Some(&to_idx) = indices.get(edge.to_node.as_str()) else {
                log::debug!(
                    "edge '{}' targets unknown node '{}'; skipped",
                    edge.id,
                    edge.to_node
                );
                continue;
            };
            let existing = indices.get(edge.from_node.as_str()).copied();
            let from_idx = match existing {
                Some(idx) => idx,
                None if is_virtual_node_id(&edge.from_node) => {
                    let idx = graph.add_node(edge.from_node.as_str());
                    indices.insert(edge.from_node.as_str(), idx);
                    let owner = VirtualSignalId::parse(&edge.from_node)
                        .and_then(|id| indices.get(id.owner).copied())
                        .filter(|owner| owner.index() < real_nodes);
                    if let Some(owner_idx) = owner {
                        graph.add_edge(owner_idx, idx, "");
                    }
                    idx
                }
                None => {
                    log::debug!(
                        "edge '{}' reads from unknown node '{}'; skipped",
                        edge.id,
                        edge.from_node
                    );
                    continue;
                }
            };
            graph.add_edge(from_idx, to_idx, edge.id.as_str());
        }

        Self {
            graph,
            indices,
            real_nodes,
        }
    }

    fn is_real(&self, idx: NodeIndex) -> bool {
        idx.index() < self.real_nodes
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.indices
            .get(node_id)
            .is_some_and(|&idx| self.is_real(idx))
    }

    /// Sources first, sinks last. Ready nodes are emitted in declaration order,
    /// so the result is deterministic for a given snapshot.
    pub fn execution_order(&self) -> Result<Vec<String>, GraphError> {
        let count = self.graph.node_count();
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| self.graph.edges_directed(idx, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut emitted = vec![false; count];
        let mut order = Vec::with_capacity(self.real_nodes);
        while let Some(Reverse(i)) = ready.pop() {
            let idx = NodeIndex::new(i);
            emitted[i] = true;
            if self.is_real(idx) {
                order.push(self.graph[idx].to_string());
            }
            for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                let degree = &mut in_degree[next.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(next.index()));
                }
            }
        }

        if order.len() < self.real_nodes {
            let unordered: Vec<String> = (0..self.real_nodes)
                .filter(|&i| !emitted[i])
                .map(|i| self.graph[NodeIndex::new(i)].to_string())
                .collect();
            return Err(GraphError::Cycle {
                unordered,
                cycles: self.cycles(),
            });
        }
        Ok(order)
    }

    /// Node sets that form dependency cycles, each in declaration order.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<NodeIndex>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .collect();
        for scc in &mut cycles {
            scc.sort();
        }
        cycles.sort();
        cycles
            .into_iter()
            .map(|scc| {
                scc.into_iter()
                    .filter(|&idx| self.is_real(idx))
                    .map(|idx| self.graph[idx].to_string())
                    .collect()
            })
            .collect()
    }

    /// Seeds plus everything transitively downstream of them. Unknown seeds
    /// are ignored; virtual seeds propagate but are not reported.
    pub fn affected_nodes<I, S>(&self, seeds: I) -> HashSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut visited: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();
        for seed in seeds {
            if let Some(&idx) = self.indices.get(seed.as_ref()) {
                if visited.insert(idx) {
                    queue.push_back(idx);
                }
            }
        }

        while let Some(current) = queue.pop_front() {
            for next in self.graph.neighbors_directed(current, Direction::Outgoing) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        visited
            .into_iter()
            .filter(|&idx| self.is_real(idx))
            .map(|idx| self.graph[idx].to_string())
            .collect()
    }

    /// Nodes reading directly from `node_id`, looking through virtual signals.
    pub fn direct_dependents(&self, node_id: &str) -> HashSet<String> {
        let mut dependents = HashSet::new();
        let Some(&idx) = self.indices.get(node_id) else {
            return dependents;
        };
        for next in self.graph.neighbors_directed(idx, Direction::Outgoing) {
            if self.is_real(next) {
                dependents.insert(self.graph[next].to_string());
            } else {
                for through in self.graph.neighbors_directed(next, Direction::Outgoing) {
                    dependents.insert(self.graph[through].to_string());
                }
            }
        }
        dependents
    }

    /// Reverse adjacency: node id to the ids of nodes that consume it.
    pub fn dependents(&self) -> HashMap<String, HashSet<String>> {
        (0..self.real_nodes)
            .map(|i| {
                let id = self.graph[NodeIndex::new(i)];
                (id.to_string(), self.direct_dependents(id))
            })
            .collect()
    }
}

pub fn topological_order(graph: &Graph) -> Result<Vec<String>, GraphError> {
    DependencyGraph::build(graph).execution_order()
}

pub fn find_affected_nodes<I, S>(graph: &Graph, seeds: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    DependencyGraph::build(graph).affected_nodes(seeds)
}

pub fn build_dependents_graph(graph: &Graph) -> HashMap<String, HashSet<String>> {
    DependencyGraph::build(graph).dependents()
}
