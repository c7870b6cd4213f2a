use std::time::Duration;

use super::metrics::ReportMetrics;
use super::template::fallback_report;
use crate::models::{SessionMemory, SessionStats};
use crate::oracle::{Oracle, OracleError};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone)]
pub struct FinalReport {
    pub content: String,
    pub stats: SessionStats,
    pub final_score: u8,
    pub grade: String,
    pub total_iterations: usize,
    pub metrics: ReportMetrics,
    /// False when the deterministic template was used.
    pub narrated: bool,
}

/// Reduce the frozen session into its report. Never fails: a generator that
/// errors or overruns `timeout` is replaced by the template.
pub async fn compile_report(
    oracle: &dyn Oracle,
    memory: &SessionMemory,
    role: &str,
    stats: SessionStats,
    timeout: Duration,
) -> FinalReport {
    let metrics = ReportMetrics::compute(memory);

    let narrative = match tokio::time::timeout(
        timeout,
        oracle.generate_report(memory, role, &stats, &metrics),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(OracleError::Unavailable(format!(
            "report generation timed out after {}s",
            timeout.as_secs()
        ))),
    };

    let (content, narrated) = match narrative {
        Ok(content) => (content, true),
        Err(err) => {
            log_warn!("report narrative failed, using template: {err}");
            (fallback_report(memory, role, &stats, &metrics), false)
        }
    };
    log_info!(
        "report compiled: score {} grade {} over {} chunks",
        metrics.final_score,
        metrics.grade,
        metrics.total_iterations
    );

    FinalReport {
        content,
        final_score: metrics.final_score,
        grade: metrics.grade.clone(),
        total_iterations: metrics.total_iterations,
        stats,
        metrics,
        narrated,
    }
}
