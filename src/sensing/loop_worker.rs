use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::activity::{ActivityTracker, PauseTransition};
use super::classifier::AppClassifier;
use super::window_source::{full_window_name, ObserverError, WindowSource};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_debug, log_info, log_warn};

const QUERY_TIMEOUT_MS: u64 = 900;

#[derive(Debug, Clone, Copy)]
pub struct ObserverConfig {
    pub poll_interval: Duration,
    pub idle_threshold_secs: u64,
}

/// Foreground app, with the front tab or document folded in when the source
/// can name it.
async fn query_window(source: &dyn WindowSource) -> Result<Option<String>, ObserverError> {
    let Some(app) = source.active_window().await? else {
        return Ok(None);
    };
    let document = source.document_name(&app).await;
    Ok(Some(full_window_name(app, document)))
}

/// Polls the foreground window and folds it into the tracker until
/// cancelled. A failed or slow query counts as "no active window"; a slow
/// one is dropped, so at most one query is ever in flight.
pub async fn observer_loop(
    tracker: ActivityTracker,
    source: Arc<dyn WindowSource>,
    classifier: Arc<AppClassifier>,
    config: ObserverConfig,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_failures: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let query = query_window(source.as_ref());
                let raw = match tokio::time::timeout(Duration::from_millis(QUERY_TIMEOUT_MS), query).await {
                    Ok(Ok(window)) => {
                        consecutive_failures = 0;
                        window
                    }
                    Ok(Err(ObserverError::Unavailable(reason))) => {
                        consecutive_failures += 1;
                        // First failure is interesting; the following thousand are not.
                        if consecutive_failures == 1 {
                            log_warn!("window query failed: {reason}");
                        } else {
                            log_debug!("window query failed ({consecutive_failures}x): {reason}");
                        }
                        None
                    }
                    Err(_) => {
                        log_debug!("window query timeout (> {}ms)", QUERY_TIMEOUT_MS);
                        None
                    }
                };

                observe_once(&tracker, &classifier, raw, Utc::now(), config.idle_threshold_secs);
            }
            _ = cancel_token.cancelled() => {
                log_info!("observer loop shutting down");
                break;
            }
        }
    }
}

/// One observer step: filter, record any switch, then update pause state.
pub fn observe_once(
    tracker: &ActivityTracker,
    classifier: &AppClassifier,
    raw_window: Option<String>,
    now: DateTime<Utc>,
    idle_threshold_secs: u64,
) {
    let current = classifier.filter_window(raw_window);
    if tracker.observe_window(current.clone(), now, classifier) {
        log_debug!("foreground -> {}", current.as_deref().unwrap_or("<none>"));
    }

    match tracker.update_pause(now, idle_threshold_secs) {
        PauseTransition::Started(at) => log_info!("pause started at {}", at.to_rfc3339()),
        PauseTransition::Ended(period) => {
            log_info!("pause ended after {}s", period.duration_secs)
        }
        PauseTransition::Unchanged => {}
    }
}
