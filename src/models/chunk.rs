use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Reduction of one fixed wall-clock window of samples.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSummary {
    pub closed_at: DateTime<Utc>,
    pub unique_windows: BTreeSet<String>,
    /// Distracted samples / samples in this chunk, as a truncated percentage.
    pub recent_distraction_ratio: u8,
    /// Distracted seconds / elapsed session seconds, as a truncated percentage.
    pub global_distraction_ratio: u8,
    pub duration_sec: u64,
    pub samples: u32,
    /// Per-window sample counts, used to pick who gets blamed.
    #[serde(skip)]
    pub window_counts: BTreeMap<String, u32>,
}

impl ChunkSummary {
    /// Windows ordered by how many samples they took, most frequent first.
    /// Ties break alphabetically so the order is stable.
    pub fn windows_by_frequency(&self) -> Vec<(&str, u32)> {
        let mut ranked: Vec<(&str, u32)> = self
            .window_counts
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}
