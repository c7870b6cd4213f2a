use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppTime {
    pub name: String,
    pub seconds: u64,
}

/// How often something happened in one app (clicks, openings).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppCount {
    pub name: String,
    pub count: u64,
}

/// End-of-session counters, computed once from the activity tracker.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    pub duration_seconds: u64,
    pub total_switches: u64,
    pub productive_switches: u64,
    pub focus_score: u8,
    pub top_apps: Vec<AppTime>,
    pub total_distraction_time: u64,
    pub pause_count: usize,
    pub total_pause_seconds: u64,
    pub key_presses: u64,
    pub mouse_clicks: u64,
    pub mouse_moves: u64,
    pub scroll_events: u64,
    /// Latest foreground windows, oldest first.
    #[serde(default)]
    pub recent_windows: Vec<String>,
    #[serde(default)]
    pub most_clicked: Option<AppCount>,
    #[serde(default)]
    pub most_opened: Option<AppCount>,
}
