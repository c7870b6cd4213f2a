use std::{sync::Arc, time::Instant};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::aggregation::ChunkAggregator;
use crate::emitter::{Emitter, OutboundEvent};
use crate::metrics::{ChunkOutcome, MetricsCollector};
use crate::models::{ChunkSummary, Sample};
use crate::oracle::{Oracle, OracleError};
use crate::report::{compile_report, FinalReport, ReportMetrics};
use crate::scoring::oracle_band;
use crate::sensing::{ActivityTracker, AppClassifier};
use crate::settings::Settings;

use super::scold::Scolder;
use super::state::{ChunkUpdate, SessionState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Everything the reporting loop reads from or writes to, apart from the
/// session record it owns.
#[derive(Clone)]
pub struct SessionRuntime {
    pub settings: Settings,
    pub tracker: ActivityTracker,
    pub classifier: Arc<AppClassifier>,
    pub oracle: Arc<dyn Oracle>,
    pub emitter: Emitter,
    pub metrics: MetricsCollector,
}

/// The single writer of [`SessionState`]. Ticks once per `tick_ms`, samples
/// the tracker, and runs the chunk transaction whenever a chunk closes.
pub struct SessionController {
    runtime: SessionRuntime,
    state: SessionState,
    aggregator: ChunkAggregator,
    scolder: Scolder,
}

impl SessionController {
    pub fn new(runtime: SessionRuntime, session_id: String, started_at: DateTime<Utc>) -> Result<Self> {
        let settings = &runtime.settings;
        let mut state = SessionState::new(settings.history_limit);
        state.begin(session_id, &settings.goal, started_at)?;

        let sample_secs = settings.tick_ms as f64 / 1000.0;
        let aggregator = ChunkAggregator::new(started_at, settings.chunk_secs, sample_secs);
        let scolder = Scolder::new(
            settings.scold_cooldown_secs,
            settings.emotion.angry_recent_above,
            runtime.classifier.clone(),
        );

        Ok(Self {
            runtime,
            state,
            aggregator,
            scolder,
        })
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    fn send(&self, event: OutboundEvent) {
        if let Err(err) = self.runtime.emitter.emit(&event) {
            log_error!("failed to emit event: {err:#}");
        }
    }

    fn session_tag(&self) -> &str {
        self.state.session_id().unwrap_or("-")
    }

    /// Status line plus the oracle's opening advice. Advice is best effort.
    pub async fn announce(&self, cancel: &CancellationToken) {
        self.send(OutboundEvent::status("Leonardo is observing."));

        let timeout = Duration::from_secs(self.runtime.settings.oracle.score_timeout_secs);
        let advice = tokio::select! {
            result = time::timeout(timeout, self.runtime.oracle.session_advice(self.state.goal())) => result,
            _ = cancel.cancelled() => return,
        };
        match advice {
            Ok(Ok(content)) => self.send(OutboundEvent::InitialAdvice { content }),
            Ok(Err(err)) => log_warn!("[{}] startup advice failed: {err}", self.session_tag()),
            Err(_) => log_warn!("[{}] startup advice timed out", self.session_tag()),
        }
    }

    /// One reporting tick: sample the tracker, publish the live update, and
    /// return the chunk if its wall-clock window just closed.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<ChunkSummary> {
        let settings = &self.runtime.settings;
        let active_window = self.runtime.tracker.active_window();
        let is_distracted = active_window
            .as_deref()
            .map(|window| self.runtime.classifier.is_distracted(window))
            .unwrap_or(false);

        self.aggregator.record(&Sample {
            timestamp: now,
            active_window,
            is_distracted,
        });

        let snapshot = self.runtime.tracker.snapshot(
            now,
            settings.idle_threshold_secs,
            settings.top_apps_limit,
        );
        self.send(snapshot.into());

        self.aggregator.poll(now)
    }

    /// Score one chunk and fold it into memory. Oracle failure, timeout, or
    /// cancellation leaves memory exactly as it was.
    pub async fn process_chunk(
        &mut self,
        chunk: ChunkSummary,
        cancel: &CancellationToken,
    ) -> Option<ChunkUpdate> {
        let settings = &self.runtime.settings;
        let timeout = Duration::from_secs(settings.oracle.score_timeout_secs);
        let previous_summary = self.state.memory().summary_so_far.clone();
        log_debug!(
            "[{}] chunk closed: recent {}% global {}% windows {:?}",
            self.session_tag(),
            chunk.recent_distraction_ratio,
            chunk.global_distraction_ratio,
            chunk.unique_windows
        );

        let started = Instant::now();
        let result = tokio::select! {
            result = time::timeout(
                timeout,
                self.runtime.oracle.score_chunk(&chunk, &previous_summary, self.state.goal()),
            ) => Some(result.unwrap_or_else(|_| {
                Err(OracleError::Unavailable(format!(
                    "scoring timed out after {}s",
                    timeout.as_secs()
                )))
            })),
            _ = cancel.cancelled() => None,
        };
        let oracle_ms = started.elapsed().as_millis() as u64;

        let verdict = match result {
            None => {
                log_info!("[{}] stop requested, discarding in-flight chunk", self.session_tag());
                self.record(&chunk, None, oracle_ms, ChunkOutcome::Abandoned).await;
                return None;
            }
            Some(Err(err)) => {
                log_warn!(
                    "[{}] chunk after iteration {} kept previous memory: {err}",
                    self.session_tag(),
                    self.state.memory().last_iteration()
                );
                self.record(&chunk, None, oracle_ms, ChunkOutcome::Failed).await;
                return None;
            }
            Some(Ok(verdict)) => verdict,
        };

        let settings = &self.runtime.settings;
        let update = match self
            .state
            .apply_chunk(&chunk, verdict, &settings.correction, &settings.emotion)
        {
            Ok(update) => update,
            Err(err) => {
                log_error!("[{}] chunk rejected: {err:#}", self.session_tag());
                return None;
            }
        };

        if update.overridden {
            log_info!(
                "[{}] iteration {}: oracle score {} clamped to {}",
                self.session_tag(),
                update.iteration,
                update.oracle_score,
                update.score
            );
        }
        if let Some(stated) = update.oracle_emotion {
            let expected = oracle_band(chunk.recent_distraction_ratio, &self.runtime.settings.emotion);
            if stated != expected {
                log_debug!(
                    "oracle picked {} outside its band ({} expected), showing {}",
                    stated.as_str(),
                    expected.as_str(),
                    update.emotion.as_str()
                );
            }
        }

        self.send(OutboundEvent::LeoComment {
            content: update.comment.clone(),
            focus_score: update.score,
            emotion: update.emotion,
        });
        if let Some(scold) = self.scolder.consider(&chunk, chunk.closed_at) {
            log_info!("[{}] scolding about {}", self.session_tag(), scold.target);
            self.send(OutboundEvent::Scold {
                target: scold.target,
                message: scold.message,
            });
        }

        let outcome = if update.overridden {
            ChunkOutcome::Overridden
        } else {
            ChunkOutcome::Accepted
        };
        self.record(&chunk, Some(update.iteration), oracle_ms, outcome).await;
        Some(update)
    }

    async fn record(
        &self,
        chunk: &ChunkSummary,
        iteration: Option<u64>,
        oracle_ms: u64,
        outcome: ChunkOutcome,
    ) {
        self.runtime
            .metrics
            .record_chunk(
                chunk.closed_at,
                iteration,
                oracle_ms,
                outcome,
                chunk.recent_distraction_ratio,
            )
            .await;
    }

    /// Tick until `cancel` fires, then end the session and compile the
    /// report.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<FinalReport> {
        let mut interval = time::interval(Duration::from_millis(self.runtime.settings.tick_ms.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately; the session clock already started.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = cancel.cancelled() => break,
            }

            if let Some(chunk) = self.tick(Utc::now()) {
                self.process_chunk(chunk, &cancel).await;
            }
        }

        Ok(self.finish(Utc::now()).await)
    }

    /// RUNNING -> ENDED, then the report. The report always arrives, even if
    /// the generator does not.
    pub async fn finish(mut self, now: DateTime<Utc>) -> FinalReport {
        let memory = self.state.end(now);
        log_info!(
            "[{}] session ended after {} scored chunks",
            self.session_tag(),
            memory.history.len()
        );
        self.send(OutboundEvent::status("Leonardo is composing the final report..."));

        let settings = &self.runtime.settings;
        let final_score = ReportMetrics::compute(&memory).final_score;
        let stats = self.runtime.tracker.stats(
            now,
            final_score,
            self.aggregator.total_distracted_secs(),
            settings.top_apps_limit,
        );
        let report = compile_report(
            self.runtime.oracle.as_ref(),
            &memory,
            self.state.goal(),
            stats,
            Duration::from_secs(settings.oracle.report_timeout_secs),
        )
        .await;

        self.send(OutboundEvent::Report {
            content: report.content.clone(),
            stats: report.stats.clone(),
            final_score: report.final_score,
            grade: report.grade.clone(),
            total_iterations: report.total_iterations,
        });

        let diagnostics = self.runtime.metrics.get_snapshot().await;
        log_info!(
            "[{}] pipeline: {} chunks ({} accepted, {} overridden, {} failed, {} abandoned), mean oracle {}ms, cpu {:.1}%, ram {:.1}MB",
            self.session_tag(),
            diagnostics.chunk_count,
            diagnostics.accepted_count,
            diagnostics.override_count,
            diagnostics.failure_count,
            diagnostics.abandoned_count,
            diagnostics.mean_oracle_ms.unwrap_or(0),
            diagnostics.system.cpu_percent,
            diagnostics.system.memory_mb
        );

        report
    }
}
