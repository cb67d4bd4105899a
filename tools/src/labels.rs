//! Segment display names. Presentation only: the core deals in ids.

use segdash_core::{rollup::SegmentKey, types::SegmentId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentLabels(BTreeMap<SegmentId, String>);

impl Default for SegmentLabels {
    fn default() -> Self {
        Self(
            [
                (0, "Occasional Buyers".to_string()),
                (1, "High-Value Loyalists".to_string()),
            ]
            .into(),
        )
    }
}

impl SegmentLabels {
    /// Load a JSON object mapping segment id to display name, e.g. `{"0": "Casual"}`.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let labels: SegmentLabels = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(labels)
    }

    pub fn name(&self, segment: SegmentId) -> String {
        self.0
            .get(&segment)
            .cloned()
            .unwrap_or_else(|| format!("Segment {segment}"))
    }

    pub fn key_name(&self, key: SegmentKey) -> String {
        match key {
            SegmentKey::Known(s) => self.name(s),
            SegmentKey::Unknown => "Unknown segment".to_string(),
        }
    }
}
