use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::models::ChunkSummary;
use crate::sensing::AppClassifier;

const FALLBACK_TARGET: &str = "Distraction";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Scold {
    pub target: String,
    pub message: String,
}

/// Rate-limited scolding. Fires on chunks with heavy recent distraction, at
/// most once per cooldown, blaming the window sampled most in the chunk.
pub struct Scolder {
    cooldown: Duration,
    threshold: u8,
    classifier: Arc<AppClassifier>,
    last_fired: Option<DateTime<Utc>>,
}

impl Scolder {
    pub fn new(cooldown_secs: u64, threshold: u8, classifier: Arc<AppClassifier>) -> Self {
        Self {
            cooldown: Duration::seconds(cooldown_secs as i64),
            threshold,
            classifier,
            last_fired: None,
        }
    }

    pub fn last_fired(&self) -> Option<DateTime<Utc>> {
        self.last_fired
    }

    pub fn consider(&mut self, chunk: &ChunkSummary, now: DateTime<Utc>) -> Option<Scold> {
        if chunk.recent_distraction_ratio <= self.threshold {
            return None;
        }
        if let Some(last) = self.last_fired {
            if now - last <= self.cooldown {
                return None;
            }
        }

        let target = self.blame(chunk);
        self.last_fired = Some(now);
        Some(Scold {
            message: format!("{target}? Again? Close it and return to your work."),
            target,
        })
    }

    fn blame(&self, chunk: &ChunkSummary) -> String {
        chunk
            .windows_by_frequency()
            .into_iter()
            .map(|(window, _)| window)
            .find(|window| !self.classifier.is_self_window(window))
            .map(|window| self.classifier.clean_name(window))
            .unwrap_or_else(|| FALLBACK_TARGET.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ClassificationSettings;
    use chrono::TimeZone;
    use std::collections::{BTreeMap, BTreeSet};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn chunk(recent: u8, counts: &[(&str, u32)]) -> ChunkSummary {
        let window_counts: BTreeMap<String, u32> =
            counts.iter().map(|(w, c)| (w.to_string(), *c)).collect();
        ChunkSummary {
            closed_at: t0(),
            unique_windows: window_counts.keys().cloned().collect::<BTreeSet<_>>(),
            recent_distraction_ratio: recent,
            global_distraction_ratio: recent,
            duration_sec: 30,
            samples: counts.iter().map(|(_, c)| c).sum(),
            window_counts,
        }
    }

    fn scolder() -> Scolder {
        let classifier = AppClassifier::new(&ClassificationSettings::default());
        Scolder::new(60, 50, Arc::new(classifier))
    }

    #[test]
    fn blames_most_frequent_non_self_window() {
        let mut scolder = scolder();
        let chunk = chunk(
            90,
            &[
                ("python3 leonardo", 20),
                ("(3) YouTube - Google Chrome", 8),
                ("Terminal", 2),
            ],
        );
        let scold = scolder.consider(&chunk, t0()).unwrap();
        assert_eq!(scold.target, "YouTube");
        assert!(scold.message.starts_with("YouTube"));
    }

    #[test]
    fn falls_back_when_only_self_windows() {
        let mut scolder = scolder();
        let scold = scolder.consider(&chunk(80, &[("Leonardo debug", 30)]), t0()).unwrap();
        assert_eq!(scold.target, "Distraction");
    }

    #[test]
    fn quiet_chunks_never_scold() {
        let mut scolder = scolder();
        assert_eq!(scolder.consider(&chunk(50, &[("YouTube", 15)]), t0()), None);
        assert_eq!(scolder.last_fired(), None);
    }

    #[test]
    fn cooldown_must_strictly_elapse() {
        let mut scolder = scolder();
        let noisy = chunk(90, &[("Netflix", 27)]);
        assert!(scolder.consider(&noisy, t0()).is_some());
        assert!(scolder.consider(&noisy, t0() + Duration::seconds(30)).is_none());
        assert!(scolder.consider(&noisy, t0() + Duration::seconds(60)).is_none());
        assert!(scolder.consider(&noisy, t0() + Duration::seconds(61)).is_some());
    }
}
