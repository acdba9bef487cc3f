//! Timeline automation attached to node parameters.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(TS, Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "automation.ts")]
pub enum Interpolation {
    /// Hold each keyframe's value until the next one.
    Stepped,
    #[default]
    Linear,
    /// Cubic Hermite with finite-difference tangents.
    Bezier,
}

#[derive(TS, Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[ts(export, export_to = "automation.ts")]
pub struct Keyframe {
    /// Normalized position inside the owning region, 0..1.
    pub time: f64,
    pub value: f64,
}

impl Keyframe {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

#[derive(TS, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "automation.ts")]
pub struct AutomationCurve {
    pub interpolation: Interpolation,
    /// Unordered; evaluation sorts by time.
    pub keyframes: Vec<Keyframe>,
}

impl AutomationCurve {
    pub fn new(interpolation: Interpolation, keyframes: Vec<Keyframe>) -> Self {
        Self {
            interpolation,
            keyframes,
        }
    }

    pub fn linear(points: &[(f64, f64)]) -> Self {
        Self::new(
            Interpolation::Linear,
            points.iter().map(|&(t, v)| Keyframe::new(t, v)).collect(),
        )
    }
}

#[derive(TS, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "automation.ts")]
#[ts(rename_all = "camelCase")]
pub struct AutomationRegion {
    pub id: String,
    /// Transport time in seconds.
    pub start_time: f64,
    pub duration: f64,
    #[serde(rename = "loop", default)]
    pub looped: bool,
    pub curve: AutomationCurve,
}

impl AutomationRegion {
    pub fn new(id: impl Into<String>, start_time: f64, duration: f64, curve: AutomationCurve) -> Self {
        Self {
            id: id.into(),
            start_time,
            duration,
            looped: false,
            curve,
        }
    }

    pub fn looping(mut self) -> Self {
        self.looped = true;
        self
    }

    /// Start, duration and loop flag compare equal.
    pub fn same_timing(&self, other: &AutomationRegion) -> bool {
        self.start_time == other.start_time
            && self.duration == other.duration
            && self.looped == other.looped
    }
}

#[derive(TS, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "automation.ts")]
#[ts(rename_all = "camelCase")]
pub struct AutomationLane {
    pub id: String,
    pub node_id: String,
    pub param_name: String,
    pub regions: Vec<AutomationRegion>,
}

impl AutomationLane {
    pub fn new(
        id: impl Into<String>,
        node_id: impl Into<String>,
        param_name: impl Into<String>,
        regions: Vec<AutomationRegion>,
    ) -> Self {
        Self {
            id: id.into(),
            node_id: node_id.into(),
            param_name: param_name.into(),
            regions,
        }
    }

    pub fn binds(&self, node_id: &str, param_name: &str) -> bool {
        self.node_id == node_id && self.param_name == param_name
    }
}

#[derive(TS, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[ts(export, export_to = "automation.ts")]
pub struct AutomationState {
    pub lanes: Vec<AutomationLane>,
}

impl AutomationState {
    pub fn lane(&self, node_id: &str, param_name: &str) -> Option<&AutomationLane> {
        self.lanes.iter().find(|l| l.binds(node_id, param_name))
    }

    pub fn lanes_for_node<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a AutomationLane> + 'a {
        self.lanes.iter().filter(move |l| l.node_id == node_id)
    }
}
