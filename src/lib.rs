//! Dependency analysis, change detection and live parameter evaluation for
//! node-based shader graphs.

pub mod automation;
pub mod error;
pub mod models;
pub mod node_graph;
pub mod settings;

pub use error::{GraphError, GraphIssue};
pub use node_graph::{
    detect_changes, evaluate_live_parameters, plan_compile, validate_graph, ChangeResult,
    CompileAction, CompilePlan, CompileSession, Graph, GraphSnapshot, SignalContext,
};
pub use settings::EngineConfig;
