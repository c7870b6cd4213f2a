use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

use crate::models::{ChunkSummary, Sample};

/// Reduces per-tick samples into fixed wall-clock chunks.
///
/// Two windows are tracked side by side: the counters of the open chunk
/// (reset at every close) and the session-wide distracted seconds (never
/// reset). Chunks close on elapsed time, not on sample count, so a slow tick
/// still produces a chunk on schedule.
#[derive(Debug, Clone)]
pub struct ChunkAggregator {
    chunk_len: Duration,
    chunk_secs: u64,
    sample_secs: f64,
    session_start: DateTime<Utc>,
    chunk_start: DateTime<Utc>,
    samples: u32,
    distracted_hits: u32,
    window_counts: BTreeMap<String, u32>,
    total_distracted_secs: f64,
}

impl ChunkAggregator {
    /// `sample_secs` is how much wall time one sample stands for (the tick).
    pub fn new(session_start: DateTime<Utc>, chunk_secs: u64, sample_secs: f64) -> Self {
        Self {
            chunk_len: Duration::seconds(chunk_secs as i64),
            chunk_secs,
            sample_secs,
            session_start,
            chunk_start: session_start,
            samples: 0,
            distracted_hits: 0,
            window_counts: BTreeMap::new(),
            total_distracted_secs: 0.0,
        }
    }

    pub fn record(&mut self, sample: &Sample) {
        self.samples += 1;
        if sample.is_distracted {
            self.distracted_hits += 1;
            self.total_distracted_secs += self.sample_secs;
        }
        if let Some(window) = &sample.active_window {
            *self.window_counts.entry(window.clone()).or_insert(0) += 1;
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now - self.chunk_start >= self.chunk_len
    }

    /// Close the chunk if its wall-clock window has elapsed.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<ChunkSummary> {
        if self.is_due(now) {
            Some(self.close(now))
        } else {
            None
        }
    }

    /// Emit the summary of the open chunk and start a fresh one at `now`.
    pub fn close(&mut self, now: DateTime<Utc>) -> ChunkSummary {
        let recent = percent(self.distracted_hits as f64, self.samples as f64);
        let elapsed_secs = (now - self.session_start).num_milliseconds() as f64 / 1000.0;
        let global = percent(self.total_distracted_secs, elapsed_secs);

        let window_counts = std::mem::take(&mut self.window_counts);
        let summary = ChunkSummary {
            closed_at: now,
            unique_windows: window_counts.keys().cloned().collect(),
            recent_distraction_ratio: recent,
            global_distraction_ratio: global,
            duration_sec: self.chunk_secs,
            samples: self.samples,
            window_counts,
        };

        self.samples = 0;
        self.distracted_hits = 0;
        self.chunk_start = now;
        summary
    }

    pub fn total_distracted_secs(&self) -> u64 {
        self.total_distracted_secs as u64
    }
}

/// Truncated percentage in [0, 100]; an empty denominator yields 0.
fn percent(part: f64, whole: f64) -> u8 {
    if whole <= 0.0 {
        return 0;
    }
    ((part / whole) * 100.0).clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn sample(at: i64, window: Option<&str>, distracted: bool) -> Sample {
        Sample {
            timestamp: t0() + Duration::seconds(at),
            active_window: window.map(str::to_string),
            is_distracted: distracted,
        }
    }

    #[test]
    fn empty_chunk_has_zero_ratios() {
        let mut agg = ChunkAggregator::new(t0(), 30, 1.0);
        let summary = agg.poll(t0() + Duration::seconds(30)).expect("chunk due");
        assert_eq!(summary.samples, 0);
        assert_eq!(summary.recent_distraction_ratio, 0);
        assert_eq!(summary.global_distraction_ratio, 0);
        assert!(summary.unique_windows.is_empty());
    }

    #[test]
    fn zero_elapsed_session_does_not_divide_by_zero() {
        let mut agg = ChunkAggregator::new(t0(), 30, 1.0);
        agg.record(&sample(0, Some("YouTube"), true));
        let summary = agg.close(t0());
        assert_eq!(summary.recent_distraction_ratio, 100);
        assert_eq!(summary.global_distraction_ratio, 0);
    }

    #[test]
    fn chunk_closes_on_wall_clock_not_sample_count() {
        let mut agg = ChunkAggregator::new(t0(), 30, 1.0);
        agg.record(&sample(1, Some("Terminal"), false));
        assert!(agg.poll(t0() + Duration::seconds(29)).is_none());
        let summary = agg.poll(t0() + Duration::seconds(30)).expect("due after 30s");
        assert_eq!(summary.samples, 1);
        assert_eq!(summary.duration_sec, 30);
    }

    #[test]
    fn recent_and_global_ratios_use_separate_windows() {
        let mut agg = ChunkAggregator::new(t0(), 30, 1.0);

        // First chunk: 30 samples, 15 distracted.
        for i in 0..30 {
            let distracted = i % 2 == 0;
            let window = if distracted { "YouTube" } else { "Terminal" };
            agg.record(&sample(i, Some(window), distracted));
        }
        let first = agg.close(t0() + Duration::seconds(30));
        assert_eq!(first.recent_distraction_ratio, 50);
        assert_eq!(first.global_distraction_ratio, 50);
        assert_eq!(first.unique_windows.len(), 2);

        // Second chunk: fully focused, 3 samples out of 4 have a window.
        for i in 30..34 {
            let window = if i == 30 { None } else { Some("Terminal") };
            agg.record(&sample(i, window, false));
        }
        let second = agg.close(t0() + Duration::seconds(60));
        assert_eq!(second.recent_distraction_ratio, 0);
        assert_eq!(second.global_distraction_ratio, 25);
        assert_eq!(second.window_counts.get("Terminal"), Some(&3));
        assert_eq!(agg.total_distracted_secs(), 15);
    }

    #[test]
    fn counters_reset_after_close() {
        let mut agg = ChunkAggregator::new(t0(), 30, 1.0);
        agg.record(&sample(0, Some("Netflix"), true));
        agg.close(t0() + Duration::seconds(30));
        let next = agg.close(t0() + Duration::seconds(60));
        assert_eq!(next.samples, 0);
        assert!(next.window_counts.is_empty());
        assert_eq!(next.recent_distraction_ratio, 0);
    }

    #[test]
    fn ratios_truncate() {
        let mut agg = ChunkAggregator::new(t0(), 30, 1.0);
        agg.record(&sample(0, None, true));
        agg.record(&sample(1, None, false));
        agg.record(&sample(2, None, false));
        let summary = agg.close(t0() + Duration::seconds(30));
        assert_eq!(summary.recent_distraction_ratio, 33);
        assert_eq!(summary.global_distraction_ratio, 3);
    }
}
