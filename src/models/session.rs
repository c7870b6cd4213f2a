use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    NotStarted,
    Running,
    Ended,
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::NotStarted
    }
}

/// Persona mood, ordered from most to least pleased.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Interested,
    Normal,
    Worried,
    Angry,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Interested => "interested",
            Emotion::Normal => "normal",
            Emotion::Worried => "worried",
            Emotion::Angry => "angry",
        }
    }

    /// Lenient parse used on oracle output. Accepts a few synonyms the
    /// models like to produce.
    pub fn parse_loose(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "happy" | "joyful" | "proud" => Some(Emotion::Happy),
            "interested" | "curious" => Some(Emotion::Interested),
            "normal" | "neutral" | "calm" => Some(Emotion::Normal),
            "worried" | "concerned" | "disappointed" => Some(Emotion::Worried),
            "angry" | "furious" | "displeased" => Some(Emotion::Angry),
            _ => None,
        }
    }
}

/// Immutable record of one scored chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub iteration: u64,
    pub timestamp: DateTime<Utc>,
    pub score: u8,
    pub windows: BTreeSet<String>,
    pub recent_distraction_ratio: u8,
    pub global_distraction_ratio: u8,
    pub duration_sec: u64,
}

/// The rolling state the reporting loop owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionMemory {
    pub focus_score: u8,
    pub emotion: Emotion,
    pub summary_so_far: String,
    pub last_comment: String,
    pub history: Vec<HistoryEntry>,
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self {
            focus_score: 100,
            emotion: Emotion::Normal,
            summary_so_far: "Session started.".to_string(),
            last_comment: "I am observing.".to_string(),
            history: Vec::new(),
        }
    }
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_iteration(&self) -> u64 {
        self.history.last().map(|entry| entry.iteration).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_parsing_accepts_synonyms() {
        assert_eq!(Emotion::parse_loose(" Neutral "), Some(Emotion::Normal));
        assert_eq!(Emotion::parse_loose("ANGRY"), Some(Emotion::Angry));
        assert_eq!(Emotion::parse_loose("ecstatic"), None);
    }

    #[test]
    fn emotion_serializes_lowercase() {
        let json = serde_json::to_string(&Emotion::Interested).unwrap();
        assert_eq!(json, "\"interested\"");
    }

    #[test]
    fn fresh_memory_matches_session_start() {
        let memory = SessionMemory::new();
        assert_eq!(memory.focus_score, 100);
        assert_eq!(memory.summary_so_far, "Session started.");
        assert!(memory.history.is_empty());
        assert_eq!(memory.last_iteration(), 0);
    }
}
