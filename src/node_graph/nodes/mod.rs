use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::models::node_graph::*;

mod audio;
mod math;

pub use audio::{
    analyzer_signal_ids, is_virtual_node_id, LiveSignalSource, VirtualSignalId,
    AUDIO_ANALYZER_TYPE, VIRTUAL_NODE_PREFIX, VIRTUAL_OUTPUT_PORT,
};
pub use math::{InputSpec, MathOp};

pub const CONSTANT_TYPE: &str = "constant";

/// Node kinds the signal resolver can evaluate without running the compiled
/// program. Anything outside this set is unresolvable for live preview.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EvalKind {
    /// Emits its stored `value` parameter.
    Constant,
    Math(MathOp),
}

impl EvalKind {
    pub fn from_type_id(type_id: &str) -> Option<EvalKind> {
        if type_id == CONSTANT_TYPE {
            return Some(EvalKind::Constant);
        }
        MathOp::from_type_id(type_id).map(EvalKind::Math)
    }
}

/// Read-only view of node type definitions, owned by the editor.
pub trait NodeTypeRegistry: Send + Sync {
    fn node_type(&self, type_id: &str) -> Option<&NodeTypeDef>;
}

impl NodeTypeRegistry for HashMap<String, NodeTypeDef> {
    fn node_type(&self, type_id: &str) -> Option<&NodeTypeDef> {
        self.get(type_id)
    }
}

/// Map-backed registry.
#[derive(Clone, Debug, Default)]
pub struct NodeTypeCatalog {
    types: HashMap<String, NodeTypeDef>,
}

static BUILTIN_CATALOG: Lazy<NodeTypeCatalog> =
    Lazy::new(|| NodeTypeCatalog::from_defs(get_node_types()));

impl NodeTypeCatalog {
    pub fn from_defs(defs: impl IntoIterator<Item = NodeTypeDef>) -> Self {
        let mut catalog = Self::default();
        for def in defs {
            catalog.register(def);
        }
        catalog
    }

    /// Shared catalog of every node type this crate knows how to evaluate.
    pub fn builtin() -> &'static NodeTypeCatalog {
        &BUILTIN_CATALOG
    }

    /// Later registrations replace earlier ones with the same id.
    pub fn register(&mut self, def: NodeTypeDef) {
        if self.types.insert(def.id.clone(), def).is_some() {
            log::debug!("node type registration replaced an existing definition");
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl NodeTypeRegistry for NodeTypeCatalog {
    fn node_type(&self, type_id: &str) -> Option<&NodeTypeDef> {
        self.types.get(type_id)
    }
}

fn constant_node_type() -> NodeTypeDef {
    NodeTypeDef {
        id: CONSTANT_TYPE.into(),
        name: "Constant".into(),
        description: Some("Outputs a fixed number.".into()),
        category: Some("Input".into()),
        inputs: vec![],
        outputs: vec![PortDef {
            id: "out".into(),
            name: "Value".into(),
            port_type: PortType::Float,
            fallback_param: None,
        }],
        params: vec![ParamDef::number("value", "Value", 0.0)],
    }
}

pub fn get_node_types() -> Vec<NodeTypeDef> {
    let mut types = vec![constant_node_type()];
    types.extend(MathOp::ALL.into_iter().map(MathOp::node_type));
    types.extend(audio::get_node_types());
    types
}
