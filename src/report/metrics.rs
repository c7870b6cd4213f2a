use serde::Serialize;

use crate::models::SessionMemory;

/// Score used when the session never produced a scored chunk.
pub const DEFAULT_FINAL_SCORE: u8 = 50;
const DEEP_WORK_MIN_SCORE: u8 = 70;
const DISTRACTION_EVENT_BELOW: u8 = 60;
const TREND_DELTA: f64 = 10.0;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Improving => "improving",
            Trend::Declining => "declining",
            Trend::Stable => "stable",
        }
    }
}

pub fn grade_for(score: u8) -> &'static str {
    match score {
        90.. => "A+",
        85..=89 => "A",
        80..=84 => "A-",
        75..=79 => "B+",
        70..=74 => "B",
        65..=69 => "B-",
        60..=64 => "C+",
        50..=59 => "C",
        _ => "D",
    }
}

fn mean(scores: &[u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64
}

/// Compares the average of the second half against the first half. An odd
/// middle element goes to the second half.
pub fn classify_trend(scores: &[u8]) -> Trend {
    if scores.len() < 2 {
        return Trend::Stable;
    }
    let (first, second) = scores.split_at(scores.len() / 2);
    let delta = mean(second) - mean(first);
    if delta > TREND_DELTA {
        Trend::Improving
    } else if delta < -TREND_DELTA {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Every number the final report is allowed to state.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportMetrics {
    pub final_score: u8,
    pub grade: String,
    pub average_score: f64,
    pub max_score: u8,
    pub min_score: u8,
    pub trend: Trend,
    /// Approximation: scored chunks at or above 70 times their nominal length.
    pub deep_work_minutes: f64,
    pub distraction_events: usize,
    pub total_iterations: usize,
}

impl ReportMetrics {
    pub fn compute(memory: &SessionMemory) -> Self {
        let scores: Vec<u8> = memory.history.iter().map(|entry| entry.score).collect();
        let final_score = if scores.is_empty() {
            DEFAULT_FINAL_SCORE
        } else {
            memory.focus_score
        };

        let deep_work_secs: u64 = memory
            .history
            .iter()
            .filter(|entry| entry.score >= DEEP_WORK_MIN_SCORE)
            .map(|entry| entry.duration_sec)
            .sum();

        Self {
            final_score,
            grade: grade_for(final_score).to_string(),
            average_score: if scores.is_empty() {
                final_score as f64
            } else {
                mean(&scores)
            },
            max_score: scores.iter().copied().max().unwrap_or(final_score),
            min_score: scores.iter().copied().min().unwrap_or(final_score),
            trend: classify_trend(&scores),
            deep_work_minutes: deep_work_secs as f64 / 60.0,
            distraction_events: scores
                .iter()
                .filter(|score| **score < DISTRACTION_EVENT_BELOW)
                .count(),
            total_iterations: scores.len(),
        }
    }
}
