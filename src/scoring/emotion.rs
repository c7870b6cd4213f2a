use crate::models::Emotion;
use crate::settings::EmotionSettings;

/// The persona's displayed mood comes from measurements, not from what the
/// oracle claims: heavy recent distraction is always angry, otherwise the
/// accepted score decides.
pub fn display_emotion(score: u8, recent_distraction_ratio: u8, settings: &EmotionSettings) -> Emotion {
    if recent_distraction_ratio > settings.angry_recent_above {
        Emotion::Angry
    } else if score < settings.worried_below {
        Emotion::Worried
    } else if score > settings.happy_above {
        Emotion::Happy
    } else {
        Emotion::Normal
    }
}

/// Band the oracle is asked to choose from for a given recent ratio.
pub fn oracle_band(recent_distraction_ratio: u8, settings: &EmotionSettings) -> Emotion {
    settings
        .oracle_bands
        .iter()
        .find(|(upper, _)| recent_distraction_ratio < *upper)
        .or_else(|| settings.oracle_bands.last())
        .map(|(_, emotion)| *emotion)
        .unwrap_or(Emotion::Normal)
}

/// Human-readable band table for prompts, e.g. "below 10% -> happy".
pub fn describe_bands(settings: &EmotionSettings) -> String {
    let last = settings.oracle_bands.len().saturating_sub(1);
    let mut lower = 0u8;
    let mut lines = Vec::with_capacity(settings.oracle_bands.len());
    for (index, (upper, emotion)) in settings.oracle_bands.iter().enumerate() {
        // `oracle_band` sends everything past the table to the last band.
        if index == last {
            lines.push(format!("- {lower}% or more -> \"{}\"", emotion.as_str()));
        } else {
            lines.push(format!("- {lower}% to {}% -> \"{}\"", upper.saturating_sub(1), emotion.as_str()));
        }
        lower = *upper;
    }
    lines.join("\n")
}
