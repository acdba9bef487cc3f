use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default ceiling for chained live-value resolution.
pub const DEFAULT_MAX_RESOLVE_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// How many upstream hops the signal resolver follows before giving up.
    pub max_resolve_depth: usize,
    /// Compute the downstream closure of every change when planning a compile.
    pub track_affected_nodes: bool,
    /// Emit one summary line per compile plan.
    pub log_summary: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_resolve_depth: DEFAULT_MAX_RESOLVE_DEPTH,
            track_affected_nodes: true,
            log_summary: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, GraphError> {
        let text = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        log::debug!("loaded engine config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}
