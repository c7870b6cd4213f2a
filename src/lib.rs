pub mod aggregation;
pub mod emitter;
pub mod metrics;
pub mod models;
pub mod oracle;
pub mod report;
pub mod scoring;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod utils;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{info, warn, LevelFilter};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use emitter::{Emitter, OutboundEvent};
use metrics::MetricsCollector;
use oracle::providers::OfflineGenerator;
use oracle::{build_generator, LlmOracle, TextGenerator};
use sensing::{
    ActivityTracker, AppClassifier, CommandWindowSource, IdleProbeSource, ObserverConfig,
    SensingController,
};
use session::{SessionController, SessionRuntime};
use settings::{ProviderKind, Settings};

const STOP_COMMAND: &str = "STOP";

/// Leonardo: watches a work session and reports on focus.
#[derive(Parser, Debug)]
#[command(name = "leonardo", version, about, long_about = None)]
pub struct Cli {
    /// What you intend to work on. Read from stdin when omitted.
    pub goal: Option<String>,

    /// JSON settings file (defaults to $LEONARDO_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Oracle provider: ollama, openai (groq), gemini, huggingface, offline
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name for the provider
    #[arg(long)]
    pub model: Option<String>,

    /// Chunk length in seconds
    #[arg(long)]
    pub chunk_secs: Option<u64>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG wins
    #[arg(long, value_parser = parse_level)]
    pub log_level: Option<LevelFilter>,
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse::<LevelFilter>()
        .map_err(|_| format!("invalid log level '{value}'"))
}

impl Cli {
    fn apply(&self, settings: &mut Settings) -> Result<()> {
        if let Some(provider) = &self.provider {
            settings.oracle.provider = ProviderKind::parse(provider)
                .with_context(|| format!("unknown provider '{provider}'"))?;
        }
        if let Some(model) = &self.model {
            settings.oracle.model = Some(model.clone());
        }
        if let Some(secs) = self.chunk_secs {
            settings.chunk_secs = secs;
        }
        Ok(())
    }
}

/// Defaults, then the settings file, then environment, then flags. The
/// result is range-checked once, here.
pub fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let path = cli.config.clone().or_else(Settings::env_path);
    let mut settings = Settings::load(path.as_deref())?;
    settings.apply_env();
    cli.apply(&mut settings)?;
    settings.normalize();
    Ok(settings)
}

fn prompt_for_goal() -> String {
    eprint!("What are you working on? ");
    let _ = io::stderr().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => line,
        Err(err) => {
            warn!("could not read goal from stdin: {err}");
            String::new()
        }
    }
}

/// Stdin listener thread: a `STOP` line ends the session. EOF just ends the
/// listener; Ctrl-C still works.
fn spawn_stop_listener(cancel: CancellationToken) -> Result<()> {
    std::thread::Builder::new()
        .name("stdin-stop".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) if line.trim().eq_ignore_ascii_case(STOP_COMMAND) => {
                        info!("stop command received");
                        cancel.cancel();
                        return;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!("stdin listener failed: {err}");
                        return;
                    }
                }
            }
        })
        .context("failed to spawn stdin listener")?;
    Ok(())
}

fn build_oracle(settings: &Settings) -> LlmOracle {
    let generator: Arc<dyn TextGenerator> = match build_generator(&settings.oracle) {
        Ok(generator) => generator,
        Err(err) => {
            warn!("{err:#}; continuing without an oracle");
            Arc::new(OfflineGenerator)
        }
    };
    LlmOracle::new(
        generator,
        settings.emotion.clone(),
        settings.summary_max_chars,
    )
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let default_level = cli.log_level.unwrap_or(if settings::debug_mode() {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    utils::logging::init(default_level);

    let mut settings = resolve_settings(&cli)?;
    let goal = match &cli.goal {
        Some(goal) => goal.clone(),
        None => prompt_for_goal(),
    };
    settings.set_goal(&goal);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(run_session(settings));
    // An idle probe may still be stuck in a blocking worker.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn run_session(settings: Settings) -> Result<()> {
    let session_id = Uuid::new_v4().to_string();
    let started_at = Utc::now();
    info!("session {} starting, goal: {}", session_id, settings.goal);

    let classifier = Arc::new(
        AppClassifier::new(&settings.classification).with_goal_overrides(&settings.goal),
    );
    let tracker = ActivityTracker::new(started_at);
    let oracle = build_oracle(&settings);
    info!("oracle provider: {}", oracle.provider_name());

    let cancel = CancellationToken::new();
    spawn_stop_listener(cancel.clone())?;
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                cancel.cancel();
            }
        });
    }

    let mut sensing = SensingController::new();
    let poll = Duration::from_millis(settings.poll_interval_ms);
    sensing
        .start_sensing(
            tracker.clone(),
            Arc::new(CommandWindowSource),
            Box::new(IdleProbeSource::new(poll)),
            classifier.clone(),
            ObserverConfig {
                poll_interval: poll,
                idle_threshold_secs: settings.idle_threshold_secs,
            },
        )
        .context("cannot start input collection")?;

    let runtime = SessionRuntime {
        tracker,
        classifier,
        oracle: Arc::new(oracle),
        emitter: Emitter::stdout(),
        metrics: MetricsCollector::new(),
        settings,
    };
    let controller = SessionController::new(runtime.clone(), session_id, started_at)?;
    controller.announce(&cancel).await;

    let report = controller.run(cancel.clone()).await;
    cancel.cancel();
    if let Err(err) = sensing.stop_sensing().await {
        warn!("sensing did not stop cleanly: {err:#}");
    }
    let report = report?;

    if let Err(err) = runtime.emitter.emit(&OutboundEvent::status("Session complete.")) {
        warn!("failed to emit final status: {err:#}");
    }
    info!(
        "session finished: score {} grade {} ({} chunks)",
        report.final_score, report.grade, report.total_iterations
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_settings() {
        let cli = Cli::parse_from([
            "leonardo",
            "Write the thesis",
            "--provider",
            "gemini",
            "--model",
            "gemini-2.0-flash",
            "--chunk-secs",
            "20",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.goal.as_deref(), Some("Write the thesis"));
        assert_eq!(cli.log_level, Some(LevelFilter::Debug));

        let mut settings = Settings::default();
        cli.apply(&mut settings).unwrap();
        assert_eq!(settings.oracle.provider, ProviderKind::Gemini);
        assert_eq!(settings.oracle.model(), "gemini-2.0-flash");
        assert_eq!(settings.chunk_secs, 20);
    }

    #[test]
    fn zero_chunk_length_from_file_is_repaired() {
        let path = std::env::temp_dir().join(format!("leonardo-settings-{}.json", Uuid::new_v4()));
        std::fs::write(&path, r#"{ "chunk_secs": 0, "tick_ms": 0, "history_limit": 500 }"#).unwrap();
        let cli = Cli::parse_from(["leonardo", "--config", path.to_str().unwrap()]);

        let settings = resolve_settings(&cli).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(settings.chunk_secs >= 5);
        assert!(settings.tick_ms >= 100);
        assert!(settings.tick_ms <= settings.chunk_secs * 1000);
        assert_eq!(settings.history_limit, 50);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let cli = Cli::parse_from(["leonardo", "--provider", "clippy"]);
        assert!(cli.apply(&mut Settings::default()).is_err());
    }

    #[test]
    fn missing_key_falls_back_to_offline() {
        let mut settings = Settings::default();
        settings.oracle.provider = ProviderKind::Gemini;
        settings.oracle.api_key = None;
        std::env::remove_var("GEMINI_API_KEY");
        assert_eq!(build_oracle(&settings).provider_name(), "offline");
    }
}
