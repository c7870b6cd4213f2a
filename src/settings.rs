use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::models::Emotion;

pub const DEFAULT_GOAL: &str = "General Work Session";

const MIN_CHUNK_SECS: u64 = 5;
const MIN_TICK_MS: u64 = 100;
const MIN_POLL_MS: u64 = 50;
const MAX_HISTORY: usize = crate::session::MAX_HISTORY;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    #[serde(alias = "groq")]
    OpenAi,
    Gemini,
    #[serde(alias = "hf")]
    HuggingFace,
    Offline,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Some(ProviderKind::Ollama),
            "openai" | "groq" => Some(ProviderKind::OpenAi),
            "gemini" => Some(ProviderKind::Gemini),
            "huggingface" | "hf" => Some(ProviderKind::HuggingFace),
            "offline" | "none" => Some(ProviderKind::Offline),
            _ => None,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "http://localhost:11434",
            ProviderKind::OpenAi => "https://api.groq.com/openai/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::HuggingFace => "https://api-inference.huggingface.co",
            ProviderKind::Offline => "",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "llama3.2",
            ProviderKind::OpenAi => "llama-3.1-8b-instant",
            ProviderKind::Gemini => "gemini-2.5-flash",
            ProviderKind::HuggingFace => "meta-llama/Llama-3.2-3B-Instruct",
            ProviderKind::Offline => "",
        }
    }

    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::OpenAi => Some("GROQ_API_KEY"),
            ProviderKind::Gemini => Some("GEMINI_API_KEY"),
            ProviderKind::HuggingFace => Some("HF_API_KEY"),
            ProviderKind::Ollama | ProviderKind::Offline => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub score_timeout_secs: u64,
    pub report_timeout_secs: u64,
    pub temperature: f32,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Ollama,
            model: None,
            base_url: None,
            api_key: None,
            score_timeout_secs: 8,
            report_timeout_secs: 20,
            temperature: 0.2,
        }
    }
}

impl OracleSettings {
    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Explicit key wins; otherwise the provider's conventional env var.
    pub fn api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            let primary = self.provider.api_key_env()?;
            std::env::var(primary)
                .ok()
                .or_else(|| match self.provider {
                    ProviderKind::OpenAi => std::env::var("OPENAI_API_KEY").ok(),
                    _ => None,
                })
                .filter(|key| !key.trim().is_empty())
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSettings {
    pub productive_apps: Vec<String>,
    pub distracting_apps: Vec<String>,
    pub browser_apps: Vec<String>,
    pub browser_distractions: Vec<String>,
    pub system_processes: Vec<String>,
    /// Window names containing any of these belong to this app and are
    /// never blamed.
    pub self_markers: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            productive_apps: strings(&[
                "VSCode",
                "Visual Studio Code",
                "PyCharm",
                "Terminal",
                "Word",
                "Excel",
                "GitHub",
                "Notes",
                "Obsidian",
                "Notion",
                "Sublime Text",
                "IntelliJ IDEA",
                "Xcode",
                "Android Studio",
            ]),
            distracting_apps: strings(&[
                "YouTube",
                "TikTok",
                "Netflix",
                "Facebook",
                "Instagram",
                "WhatsApp",
                "TV",
            ]),
            browser_apps: strings(&[
                "Google Chrome",
                "Chrome",
                "Safari",
                "Firefox",
                "Microsoft Edge",
                "Edge",
                "Arc",
            ]),
            browser_distractions: strings(&[
                "Facebook",
                "Instagram",
                "Netflix",
                "YouTube",
                "TikTok",
                "Reddit",
                "Twitter",
                "Prime Video",
                "Twitch",
                "Spotify",
            ]),
            system_processes: strings(&[
                "Program Manager",
                "Windows Shell Experience Host",
                "Microsoft Text Input Application",
                "SearchUI",
                "ShellExperienceHost",
                "ApplicationFrameHost",
                "TextInputHost",
                "SystemSettings",
                "Windows Security",
                "Task Switching",
                "Task View",
                "NVIDIA GeForce Overlay",
                "Dock",
                "SystemUIServer",
                "Control Center",
                "NotificationCenter",
                "loginwindow",
                "WindowServer",
            ]),
            self_markers: strings(&["leonardo", "python", "debug"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionSettings {
    pub happy_above: u8,
    pub worried_below: u8,
    pub angry_recent_above: u8,
    /// Ordered `(exclusive upper bound on recent ratio, emotion)` bands the
    /// oracle is told to pick from. The last band catches everything above.
    pub oracle_bands: Vec<(u8, Emotion)>,
}

impl Default for EmotionSettings {
    fn default() -> Self {
        Self {
            happy_above: 85,
            worried_below: 60,
            angry_recent_above: 50,
            oracle_bands: vec![
                (10, Emotion::Happy),
                (25, Emotion::Interested),
                (45, Emotion::Normal),
                (70, Emotion::Worried),
                (101, Emotion::Angry),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionSettings {
    pub tolerance_bonus: u8,
    pub forced_comment: String,
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        Self {
            tolerance_bonus: 10,
            forced_comment: "I see your distraction clearly. Do not deceive yourself.".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub goal: String,
    pub chunk_secs: u64,
    pub tick_ms: u64,
    pub poll_interval_ms: u64,
    pub idle_threshold_secs: u64,
    pub history_limit: usize,
    pub scold_cooldown_secs: u64,
    pub top_apps_limit: usize,
    pub summary_max_chars: usize,
    pub oracle: OracleSettings,
    pub classification: ClassificationSettings,
    pub emotion: EmotionSettings,
    pub correction: CorrectionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            goal: DEFAULT_GOAL.to_string(),
            chunk_secs: 30,
            tick_ms: 1000,
            poll_interval_ms: 500,
            idle_threshold_secs: 10,
            history_limit: 50,
            scold_cooldown_secs: 60,
            top_apps_limit: 5,
            summary_max_chars: 400,
            oracle: OracleSettings::default(),
            classification: ClassificationSettings::default(),
            emotion: EmotionSettings::default(),
            correction: CorrectionSettings::default(),
        }
    }
}

impl Settings {
    /// Reads a JSON settings file. A missing file yields defaults; an
    /// unreadable one is an error; a malformed one falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            warn!("settings file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!("ignoring malformed settings {}: {err}", path.display());
            Self::default()
        }))
    }

    /// Default config path from `LEONARDO_CONFIG`, if set.
    pub fn env_path() -> Option<PathBuf> {
        std::env::var_os("LEONARDO_CONFIG").map(PathBuf::from)
    }

    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = var("LEONARDO_PROVIDER").and_then(|v| ProviderKind::parse(&v)) {
            self.oracle.provider = provider;
        }
        if let Some(model) = var("LEONARDO_MODEL") {
            self.oracle.model = Some(model);
        }
        if let Some(url) = var("LEONARDO_BASE_URL") {
            self.oracle.base_url = Some(url);
        }
        if let Some(secs) = var("LEONARDO_CHUNK_SECS").and_then(|v| v.parse().ok()) {
            self.chunk_secs = secs;
        }
        if let Some(secs) = var("LEONARDO_IDLE_SECS").and_then(|v| v.parse().ok()) {
            self.idle_threshold_secs = secs;
        }
    }

    /// Pull timing and size knobs back into range, whatever the file, env
    /// or flags said. A tick never exceeds a chunk, and a scold cooldown is
    /// at least one chunk.
    pub fn normalize(&mut self) {
        let chunk_secs = self.chunk_secs.max(MIN_CHUNK_SECS);
        let tick_ms = self.tick_ms.clamp(MIN_TICK_MS, chunk_secs.saturating_mul(1000));
        let poll_interval_ms = self.poll_interval_ms.clamp(MIN_POLL_MS, tick_ms);
        let scold_cooldown_secs = self.scold_cooldown_secs.max(chunk_secs);
        let history_limit = self.history_limit.clamp(1, MAX_HISTORY);

        if (chunk_secs, tick_ms, poll_interval_ms, scold_cooldown_secs, history_limit)
            != (
                self.chunk_secs,
                self.tick_ms,
                self.poll_interval_ms,
                self.scold_cooldown_secs,
                self.history_limit,
            )
        {
            warn!(
                "adjusted settings: chunk_secs {} -> {chunk_secs}, tick_ms {} -> {tick_ms}, \
                 poll_interval_ms {} -> {poll_interval_ms}, scold_cooldown_secs {} -> {scold_cooldown_secs}, \
                 history_limit {} -> {history_limit}",
                self.chunk_secs,
                self.tick_ms,
                self.poll_interval_ms,
                self.scold_cooldown_secs,
                self.history_limit
            );
        }

        self.chunk_secs = chunk_secs;
        self.tick_ms = tick_ms;
        self.poll_interval_ms = poll_interval_ms;
        self.scold_cooldown_secs = scold_cooldown_secs;
        self.history_limit = history_limit;
    }

    pub fn set_goal(&mut self, goal: &str) {
        let goal = goal.trim();
        self.goal = if goal.is_empty() {
            DEFAULT_GOAL.to_string()
        } else {
            goal.to_string()
        };
    }
}

pub fn debug_mode() -> bool {
    std::env::var("LEONARDO_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let json = r#"{ "chunk_secs": 15, "oracle": { "provider": "groq" } }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.chunk_secs, 15);
        assert_eq!(settings.history_limit, 50);
        assert_eq!(settings.oracle.provider, ProviderKind::OpenAi);
        assert_eq!(settings.oracle.score_timeout_secs, 8);
        assert_eq!(settings.emotion.oracle_bands.len(), 5);
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [
            ("LEONARDO_PROVIDER", "gemini"),
            ("LEONARDO_CHUNK_SECS", "45"),
            ("LEONARDO_IDLE_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.apply_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.oracle.provider, ProviderKind::Gemini);
        assert_eq!(settings.chunk_secs, 45);
        assert_eq!(settings.idle_threshold_secs, 10);
        assert_eq!(settings.oracle.model(), "gemini-2.5-flash");
    }

    #[test]
    fn normalize_repairs_out_of_range_values() {
        let json = r#"{ "chunk_secs": 0, "tick_ms": 0, "poll_interval_ms": 5000,
                        "scold_cooldown_secs": 0, "history_limit": 100 }"#;
        let mut settings: Settings = serde_json::from_str(json).unwrap();
        settings.normalize();

        assert_eq!(settings.chunk_secs, 5);
        assert_eq!(settings.tick_ms, 100);
        assert_eq!(settings.poll_interval_ms, 100);
        assert_eq!(settings.scold_cooldown_secs, 5);
        assert_eq!(settings.history_limit, 50);
    }

    #[test]
    fn normalize_keeps_defaults() {
        let mut settings = Settings::default();
        settings.normalize();
        assert_eq!(settings.chunk_secs, 30);
        assert_eq!(settings.tick_ms, 1000);
        assert_eq!(settings.poll_interval_ms, 500);
        assert_eq!(settings.scold_cooldown_secs, 60);
        assert_eq!(settings.history_limit, 50);
    }

    #[test]
    fn blank_goal_falls_back() {
        let mut settings = Settings::default();
        settings.set_goal("   ");
        assert_eq!(settings.goal, DEFAULT_GOAL);
        settings.set_goal(" Writing my thesis, Spotify allowed ");
        assert_eq!(settings.goal, "Writing my thesis, Spotify allowed");
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let oracle = OracleSettings {
            base_url: Some("http://localhost:9000/".into()),
            ..OracleSettings::default()
        };
        assert_eq!(oracle.base_url(), "http://localhost:9000");
    }
}
