use std::collections::{BTreeMap, HashMap};

use super::*;

/// Prefix marking a synthetic node id that stands for an external signal.
pub const VIRTUAL_NODE_PREFIX: &str = "virtual:";

/// Only output port a virtual signal node exposes.
pub const VIRTUAL_OUTPUT_PORT: &str = "out";

pub const AUDIO_ANALYZER_TYPE: &str = "audio-analyzer";

/// Live values for virtual signal nodes, read at UI tick rate.
///
/// Implementations must not block.
pub trait LiveSignalSource: Send + Sync {
    fn live_value(&self, virtual_node_id: &str) -> Option<f64>;
}

impl LiveSignalSource for HashMap<String, f64> {
    fn live_value(&self, virtual_node_id: &str) -> Option<f64> {
        self.get(virtual_node_id).copied()
    }
}

impl LiveSignalSource for BTreeMap<String, f64> {
    fn live_value(&self, virtual_node_id: &str) -> Option<f64> {
        self.get(virtual_node_id).copied()
    }
}

pub fn is_virtual_node_id(id: &str) -> bool {
    id.starts_with(VIRTUAL_NODE_PREFIX)
}

/// Parsed `virtual:<owner>:<signal>` id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VirtualSignalId<'a> {
    /// Node publishing the signal, e.g. an audio analyzer.
    pub owner: &'a str,
    pub signal: &'a str,
}

impl<'a> VirtualSignalId<'a> {
    pub fn parse(id: &'a str) -> Option<Self> {
        let rest = id.strip_prefix(VIRTUAL_NODE_PREFIX)?;
        let (owner, signal) = rest.rsplit_once(':')?;
        if owner.is_empty() || signal.is_empty() {
            return None;
        }
        Some(Self { owner, signal })
    }

    pub fn format(owner: &str, signal: &str) -> String {
        format!("{VIRTUAL_NODE_PREFIX}{owner}:{signal}")
    }
}

/// Virtual ids an `audio-analyzer` node publishes: one raw and one remapped
/// signal per entry of its `bands` parameter.
pub fn analyzer_signal_ids(node: &NodeInstance) -> Vec<String> {
    if node.type_id != AUDIO_ANALYZER_TYPE {
        return Vec::new();
    }
    let band_count = node
        .params
        .get("bands")
        .and_then(|v| v.as_array())
        .map(|bands| bands.len())
        .unwrap_or(0);

    let mut ids = Vec::with_capacity(band_count * 2);
    for i in 0..band_count {
        ids.push(VirtualSignalId::format(&node.id, &format!("band{i}")));
    }
    for i in 0..band_count {
        ids.push(VirtualSignalId::format(&node.id, &format!("remap{i}")));
    }
    ids
}

pub fn get_node_types() -> Vec<NodeTypeDef> {
    vec![NodeTypeDef {
        id: AUDIO_ANALYZER_TYPE.into(),
        name: "Audio Analyzer".into(),
        description: Some(
            "Splits live audio into frequency bands; each band is published as a virtual signal."
                .into(),
        ),
        category: Some("Audio".into()),
        inputs: vec![],
        outputs: vec![],
        params: vec![
            ParamDef {
                id: "bands".into(),
                name: "Bands".into(),
                param_type: ParamType::Numbers,
                default_number: None,
                default_text: None,
                min: Some(20.0),
                max: Some(20000.0),
                step: None,
                input_mode: None,
                connectable: false,
            },
            ParamDef::number("gain", "Gain", 1.0).with_range(0.0, 4.0),
            ParamDef::number("smoothing", "Smoothing", 0.5).with_range(0.0, 1.0),
            ParamDef::number("remapMin", "Remap Min", 0.0).with_range(0.0, 1.0),
            ParamDef::number("remapMax", "Remap Max", 1.0).with_range(0.0, 1.0),
        ],
    }]
}
