pub mod automation;
pub mod node_graph;
