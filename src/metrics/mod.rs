//! Pipeline diagnostics. Nothing here feeds back into scoring; it exists
//! for the end-of-session log line.

mod types;

pub use types::{ChunkMetrics, ChunkOutcome, MetricsSnapshot, SystemMetrics};

use std::sync::Arc;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::sync::Mutex;

const MAX_RECENT_CHUNKS: usize = 20;

pub struct MetricsCollector {
    inner: Arc<Mutex<MetricsState>>,
}

struct MetricsState {
    recent_chunks: Vec<ChunkMetrics>,
    chunk_count: u64,
    accepted_count: u64,
    override_count: u64,
    failure_count: u64,
    abandoned_count: u64,
    total_oracle_ms: u64,
    system: System,
    pid: Pid,
}

impl MetricsState {
    fn refresh_system(&mut self) -> SystemMetrics {
        let pid = self.pid;
        self.system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
        match self.system.process(pid) {
            Some(process) => SystemMetrics {
                cpu_percent: process.cpu_usage(),
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
            },
            None => SystemMetrics::default(),
        }
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        let pid = Pid::from_u32(std::process::id());

        // CPU usage is a delta between refreshes; take the baseline now.
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));

        Self {
            inner: Arc::new(Mutex::new(MetricsState {
                recent_chunks: Vec::with_capacity(MAX_RECENT_CHUNKS),
                chunk_count: 0,
                accepted_count: 0,
                override_count: 0,
                failure_count: 0,
                abandoned_count: 0,
                total_oracle_ms: 0,
                system,
                pid,
            })),
        }
    }

    /// Record a finished chunk; CPU/RAM are sampled at the same moment.
    pub async fn record_chunk(
        &self,
        closed_at: chrono::DateTime<chrono::Utc>,
        iteration: Option<u64>,
        oracle_ms: u64,
        outcome: ChunkOutcome,
        recent_distraction_ratio: u8,
    ) {
        let mut state = self.inner.lock().await;
        let system = state.refresh_system();

        state.chunk_count += 1;
        state.total_oracle_ms += oracle_ms;
        match outcome {
            ChunkOutcome::Accepted => state.accepted_count += 1,
            ChunkOutcome::Overridden => state.override_count += 1,
            ChunkOutcome::Failed => state.failure_count += 1,
            ChunkOutcome::Abandoned => state.abandoned_count += 1,
        }

        state.recent_chunks.push(ChunkMetrics {
            closed_at,
            iteration,
            oracle_ms,
            outcome,
            recent_distraction_ratio,
            cpu_percent: system.cpu_percent,
            memory_mb: system.memory_mb,
        });
        if state.recent_chunks.len() > MAX_RECENT_CHUNKS {
            state.recent_chunks.remove(0);
        }
    }

    pub async fn get_snapshot(&self) -> MetricsSnapshot {
        let mut state = self.inner.lock().await;
        let system = state.refresh_system();

        MetricsSnapshot {
            system,
            recent_chunks: state.recent_chunks.clone(),
            chunk_count: state.chunk_count,
            accepted_count: state.accepted_count,
            override_count: state.override_count,
            failure_count: state.failure_count,
            abandoned_count: state.abandoned_count,
            mean_oracle_ms: (state.chunk_count > 0)
                .then(|| state.total_oracle_ms / state.chunk_count),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MetricsCollector {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn counts_outcomes_and_bounds_ring() {
        let metrics = MetricsCollector::new();
        for i in 0..25u64 {
            let outcome = match i % 4 {
                0 => ChunkOutcome::Accepted,
                1 => ChunkOutcome::Overridden,
                2 => ChunkOutcome::Failed,
                _ => ChunkOutcome::Abandoned,
            };
            metrics.record_chunk(Utc::now(), Some(i + 1), 100, outcome, 10).await;
        }

        let snapshot = metrics.get_snapshot().await;
        assert_eq!(snapshot.chunk_count, 25);
        assert_eq!(snapshot.recent_chunks.len(), 20);
        assert_eq!(snapshot.recent_chunks[0].iteration, Some(6));
        assert_eq!(snapshot.accepted_count, 7);
        assert_eq!(snapshot.override_count, 6);
        assert_eq!(snapshot.failure_count, 6);
        assert_eq!(snapshot.abandoned_count, 6);
        assert_eq!(snapshot.mean_oracle_ms, Some(100));
    }

    #[tokio::test]
    async fn empty_snapshot_has_no_mean() {
        let snapshot = MetricsCollector::new().get_snapshot().await;
        assert_eq!(snapshot.chunk_count, 0);
        assert_eq!(snapshot.mean_oracle_ms, None);
    }
}
