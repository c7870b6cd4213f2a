use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkOutcome {
    Accepted,
    Overridden,
    Failed,
    Abandoned,
}

/// One scoring round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetrics {
    pub closed_at: DateTime<Utc>,
    pub iteration: Option<u64>,
    pub oracle_ms: u64,
    pub outcome: ChunkOutcome,
    pub recent_distraction_ratio: u8,
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub cpu_percent: f32,
    pub memory_mb: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub system: SystemMetrics,
    pub recent_chunks: Vec<ChunkMetrics>,
    pub chunk_count: u64,
    pub accepted_count: u64,
    pub override_count: u64,
    pub failure_count: u64,
    pub abandoned_count: u64,
    pub mean_oracle_ms: Option<u64>,
}
