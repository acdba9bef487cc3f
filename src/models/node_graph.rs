use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use ts_rs::TS;

use super::automation::AutomationState;

#[derive(TS, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[ts(export, export_to = "schema.ts")]
pub enum PortType {
    Float,
    Vector,
    Color,
    Shape,
    Texture,
    Signal,
}

#[derive(TS, Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[ts(export, export_to = "schema.ts")]
pub enum ParamType {
    Number,
    Int,
    Text,
    Bool,
    /// Compound parameter stored as an array of numbers (e.g. frequency bands).
    Numbers,
}

/// How an upstream connection combines with a parameter's configured value.
#[derive(TS, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "schema.ts")]
pub enum InputMode {
    #[default]
    Override,
    Add,
    Subtract,
    Multiply,
}

impl InputMode {
    pub fn combine(self, configured: f64, upstream: f64) -> f64 {
        match self {
            InputMode::Override => upstream,
            InputMode::Add => configured + upstream,
            InputMode::Subtract => configured - upstream,
            InputMode::Multiply => configured * upstream,
        }
    }
}

#[derive(TS, Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "schema.ts")]
#[ts(rename_all = "camelCase")]
pub struct PortDef {
    pub id: String,
    pub name: String,
    pub port_type: PortType,
    /// Parameter read when nothing is connected to this port.
    #[serde(default)]
    pub fallback_param: Option<String>,
}

#[derive(TS, Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "schema.ts")]
#[ts(rename_all = "camelCase")]
pub struct ParamDef {
    pub id: String,
    pub name: String,
    pub param_type: ParamType,
    pub default_number: Option<f64>,
    pub default_text: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub input_mode: Option<InputMode>,
    /// False for parameters that have no connectable port in the editor.
    #[serde(default = "default_connectable")]
    pub connectable: bool,
}

fn default_connectable() -> bool {
    true
}

impl ParamDef {
    pub fn number(id: &str, name: &str, default: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            param_type: ParamType::Number,
            default_number: Some(default),
            default_text: None,
            min: None,
            max: None,
            step: None,
            input_mode: None,
            connectable: true,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_input_mode(mut self, mode: InputMode) -> Self {
        self.input_mode = Some(mode);
        self
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.param_type, ParamType::Number | ParamType::Int)
    }

    /// Range automation output is scaled into. Unbounded sides default to 0..1.
    pub fn range(&self) -> (f64, f64) {
        (self.min.unwrap_or(0.0), self.max.unwrap_or(1.0))
    }
}

#[derive(TS, Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "schema.ts")]
#[ts(rename_all = "camelCase")]
pub struct NodeTypeDef {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub inputs: Vec<PortDef>,
    pub outputs: Vec<PortDef>,
    pub params: Vec<ParamDef>,
}

impl NodeTypeDef {
    pub fn param(&self, id: &str) -> Option<&ParamDef> {
        self.params.iter().find(|p| p.id == id)
    }

    pub fn input(&self, id: &str) -> Option<&PortDef> {
        self.inputs.iter().find(|p| p.id == id)
    }
}

#[derive(TS, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "schema.ts")]
#[ts(rename_all = "camelCase")]
pub struct NodeInstance {
    pub id: String,
    pub type_id: String,
    #[ts(type = "Record<string, unknown>")]
    pub params: HashMap<String, Value>,
    #[serde(default)]
    pub input_modes: HashMap<String, InputMode>,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
}

impl NodeInstance {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            params: HashMap::new(),
            input_modes: HashMap::new(),
            position_x: None,
            position_y: None,
        }
    }

    pub fn with_param(mut self, name: &str, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_input_mode(mut self, param: &str, mode: InputMode) -> Self {
        self.input_modes.insert(param.into(), mode);
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position_x = Some(x);
        self.position_y = Some(y);
        self
    }

    /// Stored value of a parameter when it is a plain number.
    pub fn number_param(&self, name: &str) -> Option<f64> {
        self.params.get(name).and_then(Value::as_f64)
    }
}

/// Where a connection lands on its target node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeTarget<'a> {
    Port(&'a str),
    Param(&'a str),
}

#[derive(TS, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "schema.ts")]
#[ts(rename_all = "camelCase")]
pub struct Edge {
    pub id: String,
    pub from_node: String,
    pub from_port: String,
    pub to_node: String,
    #[serde(default)]
    pub to_port: Option<String>,
    #[serde(default)]
    pub to_param: Option<String>,
}

impl Edge {
    pub fn to_port(
        id: impl Into<String>,
        from_node: impl Into<String>,
        from_port: impl Into<String>,
        to_node: impl Into<String>,
        to_port: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from_node: from_node.into(),
            from_port: from_port.into(),
            to_node: to_node.into(),
            to_port: Some(to_port.into()),
            to_param: None,
        }
    }

    pub fn to_param(
        id: impl Into<String>,
        from_node: impl Into<String>,
        from_port: impl Into<String>,
        to_node: impl Into<String>,
        to_param: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            from_node: from_node.into(),
            from_port: from_port.into(),
            to_node: to_node.into(),
            to_port: None,
            to_param: Some(to_param.into()),
        }
    }

    /// Parameter bindings win over port targets when both are present.
    pub fn target(&self) -> Option<EdgeTarget<'_>> {
        match (&self.to_param, &self.to_port) {
            (Some(param), _) => Some(EdgeTarget::Param(param.as_str())),
            (None, Some(port)) => Some(EdgeTarget::Port(port.as_str())),
            (None, None) => None,
        }
    }

    /// Order-independent identity used when comparing connection sets.
    pub fn canonical_key(&self) -> String {
        format!(
            "{}:{}->{}:{}:{}",
            self.from_node,
            self.from_port,
            self.to_node,
            self.to_port.as_deref().unwrap_or(""),
            self.to_param.as_deref().unwrap_or("")
        )
    }
}

#[derive(TS, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "schema.ts")]
#[ts(rename_all = "camelCase")]
pub struct Graph {
    pub nodes: Vec<NodeInstance>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub automation: AutomationState,
}

impl Graph {
    pub fn node(&self, id: &str) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Freeze this graph into a published snapshot.
    pub fn into_snapshot(self) -> GraphSnapshot {
        Arc::new(self)
    }
}

/// A published, immutable graph. Edits produce a new snapshot; comparison logic
/// relies on unchanged snapshots keeping their allocation.
pub type GraphSnapshot = Arc<Graph>;
