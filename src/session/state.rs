use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::models::{ChunkSummary, Emotion, HistoryEntry, SessionMemory, SessionStatus};
use crate::oracle::ChunkVerdict;
use crate::scoring::{apply_correction, display_emotion};
use crate::settings::{CorrectionSettings, EmotionSettings};

/// Hard ceiling on retained history, whatever the settings ask for.
pub const MAX_HISTORY: usize = 50;

/// What one accepted chunk changed, for the outbound packets and logs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkUpdate {
    pub iteration: u64,
    pub score: u8,
    pub emotion: Emotion,
    pub comment: String,
    pub overridden: bool,
    pub oracle_score: u8,
    pub oracle_emotion: Option<Emotion>,
}

/// The session record. Only the reporting loop holds it, so there is
/// exactly one writer.
#[derive(Debug, Clone)]
pub struct SessionState {
    status: SessionStatus,
    session_id: Option<String>,
    goal: String,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    history_limit: usize,
    memory: SessionMemory,
}

impl SessionState {
    pub fn new(history_limit: usize) -> Self {
        Self {
            status: SessionStatus::NotStarted,
            session_id: None,
            goal: String::new(),
            started_at: None,
            ended_at: None,
            history_limit: history_limit.clamp(1, MAX_HISTORY),
            memory: SessionMemory::new(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn memory(&self) -> &SessionMemory {
        &self.memory
    }

    pub fn begin(&mut self, session_id: String, goal: &str, started_at: DateTime<Utc>) -> Result<()> {
        if self.status != SessionStatus::NotStarted {
            return Err(anyhow!("session already started"));
        }
        self.status = SessionStatus::Running;
        self.session_id = Some(session_id);
        self.goal = goal.to_string();
        self.started_at = Some(started_at);
        self.memory = SessionMemory::new();
        Ok(())
    }

    /// Fold one scored chunk into memory. Correction runs first, then the
    /// whole update is applied at once; the history keeps only the newest
    /// `history_limit` entries.
    pub fn apply_chunk(
        &mut self,
        chunk: &ChunkSummary,
        verdict: ChunkVerdict,
        correction: &CorrectionSettings,
        emotions: &EmotionSettings,
    ) -> Result<ChunkUpdate> {
        if self.status != SessionStatus::Running {
            return Err(anyhow!("session is not running ({:?})", self.status));
        }

        let oracle_score = verdict.score;
        let corrected = apply_correction(
            oracle_score,
            verdict.comment,
            chunk.recent_distraction_ratio,
            correction,
        );
        let emotion = display_emotion(corrected.score, chunk.recent_distraction_ratio, emotions);
        let iteration = self.memory.last_iteration() + 1;

        self.memory.history.push(HistoryEntry {
            iteration,
            timestamp: chunk.closed_at,
            score: corrected.score,
            windows: chunk.unique_windows.clone(),
            recent_distraction_ratio: chunk.recent_distraction_ratio,
            global_distraction_ratio: chunk.global_distraction_ratio,
            duration_sec: chunk.duration_sec,
        });
        if self.memory.history.len() > self.history_limit {
            let excess = self.memory.history.len() - self.history_limit;
            self.memory.history.drain(..excess);
        }
        self.memory.focus_score = corrected.score;
        self.memory.emotion = emotion;
        self.memory.summary_so_far = verdict.summary;
        self.memory.last_comment = corrected.comment.clone();

        Ok(ChunkUpdate {
            iteration,
            score: corrected.score,
            emotion,
            comment: corrected.comment,
            overridden: corrected.overridden,
            oracle_score,
            oracle_emotion: verdict.emotion,
        })
    }

    /// Freeze the session. Idempotent; returns the final memory.
    pub fn end(&mut self, at: DateTime<Utc>) -> SessionMemory {
        if self.status != SessionStatus::Ended {
            self.status = SessionStatus::Ended;
            self.ended_at = Some(at);
        }
        self.memory.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, BTreeSet};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn chunk(i: i64, recent: u8) -> ChunkSummary {
        ChunkSummary {
            closed_at: t0() + Duration::seconds(30 * i),
            unique_windows: BTreeSet::from([format!("Window {i}")]),
            recent_distraction_ratio: recent,
            global_distraction_ratio: recent,
            duration_sec: 30,
            samples: 30,
            window_counts: BTreeMap::new(),
        }
    }

    fn verdict(score: u8) -> ChunkVerdict {
        ChunkVerdict {
            summary: "Working.".into(),
            emotion: Some(Emotion::Happy),
            score,
            comment: "Good.".into(),
        }
    }

    fn running(limit: usize) -> SessionState {
        let mut state = SessionState::new(limit);
        state.begin("s-1".into(), "Write", t0()).unwrap();
        state
    }

    #[test]
    fn lifecycle_is_one_way() {
        let mut state = SessionState::new(50);
        assert_eq!(state.status(), SessionStatus::NotStarted);
        assert!(state
            .apply_chunk(&chunk(1, 0), verdict(90), &CorrectionSettings::default(), &EmotionSettings::default())
            .is_err());

        state.begin("s-1".into(), "Write", t0()).unwrap();
        assert_eq!(state.status(), SessionStatus::Running);
        assert!(state.begin("s-2".into(), "Write", t0()).is_err());

        state.end(t0());
        assert_eq!(state.status(), SessionStatus::Ended);
        assert!(state
            .apply_chunk(&chunk(1, 0), verdict(90), &CorrectionSettings::default(), &EmotionSettings::default())
            .is_err());
        assert!(state.memory().history.is_empty());
    }

    #[test]
    fn accepted_chunk_updates_memory() {
        let mut state = running(50);
        let update = state
            .apply_chunk(&chunk(1, 0), verdict(95), &CorrectionSettings::default(), &EmotionSettings::default())
            .unwrap();

        assert_eq!(update.iteration, 1);
        assert_eq!(update.score, 95);
        assert_eq!(update.emotion, Emotion::Happy);
        assert!(!update.overridden);
        let memory = state.memory();
        assert_eq!(memory.focus_score, 95);
        assert_eq!(memory.summary_so_far, "Working.");
        assert_eq!(memory.last_comment, "Good.");
        assert_eq!(memory.history[0].windows, BTreeSet::from(["Window 1".to_string()]));
    }

    #[test]
    fn optimistic_oracle_is_overridden() {
        let mut state = running(50);
        let update = state
            .apply_chunk(&chunk(1, 90), verdict(80), &CorrectionSettings::default(), &EmotionSettings::default())
            .unwrap();

        assert!(update.overridden);
        assert_eq!(update.score, 20);
        assert_eq!(update.oracle_score, 80);
        assert_eq!(update.emotion, Emotion::Angry);
        assert_eq!(state.memory().last_comment, CorrectionSettings::default().forced_comment);
    }

    #[test]
    fn history_is_bounded_and_ordered() {
        let mut state = running(50);
        for i in 1..=51 {
            state
                .apply_chunk(&chunk(i, 0), verdict(80), &CorrectionSettings::default(), &EmotionSettings::default())
                .unwrap();
        }

        let history = &state.memory().history;
        assert_eq!(history.len(), 50);
        assert_eq!(history[0].iteration, 2);
        assert_eq!(history[49].iteration, 51);
        assert!(history.windows(2).all(|w| w[1].iteration == w[0].iteration + 1));
    }

    #[test]
    fn oversized_limit_is_capped() {
        let mut state = running(100);
        for i in 1..=60 {
            state
                .apply_chunk(&chunk(i, 0), verdict(80), &CorrectionSettings::default(), &EmotionSettings::default())
                .unwrap();
        }

        let history = &state.memory().history;
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history[0].iteration, 11);
        assert_eq!(history[MAX_HISTORY - 1].iteration, 60);
    }

    #[test]
    fn end_freezes_memory() {
        let mut state = running(50);
        state
            .apply_chunk(&chunk(1, 0), verdict(70), &CorrectionSettings::default(), &EmotionSettings::default())
            .unwrap();
        let frozen = state.end(t0() + Duration::seconds(40));
        assert_eq!(frozen.history.len(), 1);
        assert_eq!(state.ended_at(), Some(t0() + Duration::seconds(40)));
        assert_eq!(state.end(t0() + Duration::seconds(90)).history.len(), 1);
        assert_eq!(state.ended_at(), Some(t0() + Duration::seconds(40)));
    }
}
