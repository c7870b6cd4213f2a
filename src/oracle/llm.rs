use async_trait::async_trait;
use std::sync::Arc;

use super::prompts::{advice_prompt, chunk_prompt, report_prompt};
use super::providers::TextGenerator;
use super::verdict::parse_verdict;
use super::{ChunkVerdict, Oracle, OracleError};
use crate::models::{ChunkSummary, SessionMemory, SessionStats};
use crate::report::ReportMetrics;
use crate::scoring::describe_bands;
use crate::settings::EmotionSettings;
use crate::utils::text::truncate_chars;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

const CHUNK_MAX_TOKENS: u32 = 300;
const REPORT_MAX_TOKENS: u32 = 900;
const ADVICE_MAX_TOKENS: u32 = 120;
const ADVICE_MAX_CHARS: usize = 400;

/// [`Oracle`] backed by a language model behind any [`TextGenerator`].
pub struct LlmOracle {
    generator: Arc<dyn TextGenerator>,
    emotion: EmotionSettings,
    summary_max_chars: usize,
}

impl LlmOracle {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        emotion: EmotionSettings,
        summary_max_chars: usize,
    ) -> Self {
        Self {
            generator,
            emotion,
            summary_max_chars,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.generator.name()
    }
}

fn non_empty(text: String, what: &str) -> Result<String, OracleError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(OracleError::MalformedResponse(format!("empty {what}")))
    } else {
        Ok(trimmed.to_string())
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn score_chunk(
        &self,
        chunk: &ChunkSummary,
        previous_summary: &str,
        goal: &str,
    ) -> Result<ChunkVerdict, OracleError> {
        let prompt = chunk_prompt(
            chunk,
            previous_summary,
            goal,
            &describe_bands(&self.emotion),
            self.summary_max_chars,
        );
        let text = self.generator.complete(&prompt, CHUNK_MAX_TOKENS).await?;
        log_debug!("[{}] chunk reply: {}", self.generator.name(), text);
        parse_verdict(&text, chunk, previous_summary, self.summary_max_chars)
    }

    async fn generate_report(
        &self,
        memory: &SessionMemory,
        role: &str,
        stats: &SessionStats,
        metrics: &ReportMetrics,
    ) -> Result<String, OracleError> {
        let prompt = report_prompt(memory, role, stats, metrics);
        let text = self.generator.complete(&prompt, REPORT_MAX_TOKENS).await?;
        non_empty(text, "report")
    }

    async fn session_advice(&self, goal: &str) -> Result<String, OracleError> {
        let text = self
            .generator
            .complete(&advice_prompt(goal), ADVICE_MAX_TOKENS)
            .await?;
        non_empty(text, "advice").map(|advice| truncate_chars(&advice, ADVICE_MAX_CHARS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Emotion;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    /// Replies with canned text and remembers the prompts it was given.
    struct Canned {
        reply: Result<String, OracleError>,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(reply: Result<&str, OracleError>) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.map(str::to_string),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, OracleError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn chunk(recent: u8, global: u8) -> ChunkSummary {
        ChunkSummary {
            closed_at: Utc::now(),
            unique_windows: BTreeSet::from(["YouTube".to_string()]),
            recent_distraction_ratio: recent,
            global_distraction_ratio: global,
            duration_sec: 30,
            samples: 30,
            window_counts: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn prose_wrapped_reply_is_parsed() {
        let generator = Canned::new(Ok(
            "Certainly! Here you go:\n{\"summary\": \"Watched videos.\", \"emotion\": \"angry\", \
             \"focus_score\": 20, \"comment\": \"Back to work.\"}\nHope that helps.",
        ));
        let oracle = LlmOracle::new(generator.clone(), EmotionSettings::default(), 200);

        let verdict = oracle.score_chunk(&chunk(90, 60), "Started.", "Write docs").await.unwrap();

        assert_eq!(
            verdict,
            ChunkVerdict {
                summary: "Watched videos.".into(),
                emotion: Some(Emotion::Angry),
                score: 20,
                comment: "Back to work.".into(),
            }
        );
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("\"Write docs\""));
        assert!(prompts[0].contains("70% or more -> \"angry\""));
    }

    #[tokio::test]
    async fn reply_without_json_is_malformed() {
        let oracle = LlmOracle::new(Canned::new(Ok("I refuse.")), EmotionSettings::default(), 200);
        let err = oracle.score_chunk(&chunk(0, 0), "", "x").await.unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn generator_failure_passes_through() {
        let failing = Canned::new(Err(OracleError::Unavailable("down".into())));
        let oracle = LlmOracle::new(failing, EmotionSettings::default(), 200);
        assert_eq!(
            oracle.session_advice("Study").await,
            Err(OracleError::Unavailable("down".into()))
        );
    }

    #[tokio::test]
    async fn blank_report_is_rejected() {
        let oracle = LlmOracle::new(Canned::new(Ok("   \n")), EmotionSettings::default(), 200);
        let metrics = ReportMetrics::compute(&SessionMemory::new());
        let err = oracle
            .generate_report(&SessionMemory::new(), "Study", &SessionStats::default(), &metrics)
            .await
            .unwrap_err();
        assert!(matches!(err, OracleError::MalformedResponse(_)));
    }
}
