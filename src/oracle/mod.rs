//! The scoring oracle: an untrusted text generator asked to judge chunks,
//! write the final narrative, and give startup advice.
//!
//! The core pipeline only sees the [`Oracle`] capability. Provider
//! differences stay inside [`providers`].

pub mod extract;
pub mod llm;
pub mod prompts;
pub mod providers;
pub mod verdict;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ChunkSummary, Emotion, SessionMemory, SessionStats};
use crate::report::ReportMetrics;

pub use extract::{extract_json_object, ExtractError};
pub use llm::LlmOracle;
pub use providers::{build_generator, TextGenerator};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle returned malformed output: {0}")]
    MalformedResponse(String),
}

impl From<ExtractError> for OracleError {
    fn from(err: ExtractError) -> Self {
        OracleError::MalformedResponse(err.to_string())
    }
}

/// What the oracle says about one chunk, after repair but before the
/// score correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkVerdict {
    pub summary: String,
    pub emotion: Option<Emotion>,
    pub score: u8,
    pub comment: String,
}

#[async_trait]
pub trait Oracle: Send + Sync {
    async fn score_chunk(
        &self,
        chunk: &ChunkSummary,
        previous_summary: &str,
        goal: &str,
    ) -> Result<ChunkVerdict, OracleError>;

    /// Narrative report. Every number in it must come from `metrics` and
    /// `stats`; the generator is only trusted with prose.
    async fn generate_report(
        &self,
        memory: &SessionMemory,
        role: &str,
        stats: &SessionStats,
        metrics: &ReportMetrics,
    ) -> Result<String, OracleError>;

    async fn session_advice(&self, goal: &str) -> Result<String, OracleError>;
}
