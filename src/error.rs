use std::path::PathBuf;

/// Structural failures surfaced to the caller once, never on tick-rate paths.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Topological ordering could not consume every node.
    #[error("graph has a cycle; unordered nodes: {}", .unordered.join(", "))]
    Cycle {
        /// Every node left without a position in the execution order.
        unordered: Vec<String>,
        /// Strongly connected components that form the cycles themselves.
        cycles: Vec<Vec<String>>,
    },
    #[error("invalid engine config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One-time validation findings for the editor's graph validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphIssue {
    #[error("connection {edge} reads from missing node '{node}'")]
    MissingSource { edge: String, node: String },
    #[error("connection {edge} targets missing node '{node}'")]
    MissingTarget { edge: String, node: String },
    #[error("connection {edge} has neither a target port nor a target parameter")]
    MissingTargetSlot { edge: String },
    #[error("connection {edge} connects node '{node}' to itself")]
    SelfConnection { edge: String, node: String },
    #[error("parameter {node}.{param} is bound by {} connections: {}", .edges.len(), .edges.join(", "))]
    DuplicateParamBinding {
        node: String,
        param: String,
        edges: Vec<String>,
    },
    #[error("input {node}.{port} is fed by {} connections: {}", .edges.len(), .edges.join(", "))]
    DuplicatePortBinding {
        node: String,
        port: String,
        edges: Vec<String>,
    },
    #[error("node '{node}' has unknown type '{type_id}'")]
    UnknownNodeType { node: String, type_id: String },
    #[error("connection {edge} targets unknown parameter {node}.{param}")]
    UnknownParam {
        edge: String,
        node: String,
        param: String,
    },
    #[error("connection {edge} targets unknown input {node}.{port}")]
    UnknownPort {
        edge: String,
        node: String,
        port: String,
    },
    #[error("connection {edge} targets {node}.{param}, which is not connectable")]
    ParamNotConnectable {
        edge: String,
        node: String,
        param: String,
    },
    #[error("dependency cycle through: {}", .nodes.join(" -> "))]
    Cycle { nodes: Vec<String> },
}
