use anyhow::{bail, Context, Result};
use log::info;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::activity::ActivityTracker;
use super::classifier::AppClassifier;
use super::input::{input_collector_loop, InputSource};
use super::loop_worker::{observer_loop, ObserverConfig};
use super::window_source::WindowSource;

/// Owns the background tasks that feed the activity tracker: the input
/// source, the input collector, and the window observer.
pub struct SensingController {
    handles: Vec<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Default for SensingController {
    fn default() -> Self {
        Self::new()
    }
}

impl SensingController {
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
            cancel_token: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel_token.is_some()
    }

    /// Input collection starts first: if it cannot start, nothing else does.
    pub fn start_sensing(
        &mut self,
        tracker: ActivityTracker,
        window_source: Arc<dyn WindowSource>,
        input_source: Box<dyn InputSource>,
        classifier: Arc<AppClassifier>,
        config: ObserverConfig,
    ) -> Result<()> {
        if self.is_active() {
            bail!("sensing already active");
        }

        let cancel_token = CancellationToken::new();
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        let source_name = input_source.name();
        let input_handle = input_source
            .start(input_tx, cancel_token.clone())
            .with_context(|| format!("failed to start input source '{source_name}'"))?;
        info!("input source '{}' started", source_name);

        let collector = tokio::spawn(input_collector_loop(
            input_rx,
            tracker.clone(),
            cancel_token.clone(),
        ));
        let observer = tokio::spawn(observer_loop(
            tracker,
            window_source,
            classifier,
            config,
            cancel_token.clone(),
        ));

        self.handles = vec![input_handle, collector, observer];
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop_sensing(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        for handle in self.handles.drain(..) {
            handle.await.context("sensing task failed to join")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::input::{InputEvent, InputKind, InputSender};
    use crate::sensing::window_source::ObserverError;
    use crate::settings::ClassificationSettings;
    use chrono::Utc;
    use tokio::time::Duration;

    struct FixedWindow;

    #[async_trait::async_trait]
    impl WindowSource for FixedWindow {
        async fn active_window(&self) -> Result<Option<String>, ObserverError> {
            Ok(Some("Obsidian".into()))
        }
    }

    struct OneKey;

    impl InputSource for OneKey {
        fn name(&self) -> &'static str {
            "one-key"
        }

        fn start(self: Box<Self>, events: InputSender, _cancel: CancellationToken) -> Result<JoinHandle<()>> {
            Ok(tokio::spawn(async move {
                let _ = events.send(InputEvent::now(InputKind::KeyPress));
            }))
        }
    }

    struct Broken;

    impl InputSource for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn start(self: Box<Self>, _events: InputSender, _cancel: CancellationToken) -> Result<JoinHandle<()>> {
            bail!("no permission to read input devices")
        }
    }

    fn config() -> ObserverConfig {
        ObserverConfig {
            poll_interval: Duration::from_millis(10),
            idle_threshold_secs: 10,
        }
    }

    fn classifier() -> Arc<AppClassifier> {
        Arc::new(AppClassifier::new(&ClassificationSettings::default()))
    }

    #[tokio::test]
    async fn start_and_stop_sensing() {
        let tracker = ActivityTracker::new(Utc::now());
        let mut controller = SensingController::new();
        controller
            .start_sensing(tracker.clone(), Arc::new(FixedWindow), Box::new(OneKey), classifier(), config())
            .unwrap();
        assert!(controller
            .start_sensing(tracker.clone(), Arc::new(FixedWindow), Box::new(OneKey), classifier(), config())
            .is_err());

        tokio::time::sleep(Duration::from_millis(60)).await;
        controller.stop_sensing().await.unwrap();

        assert!(!controller.is_active());
        assert_eq!(tracker.active_window(), Some("Obsidian".to_string()));
        assert_eq!(tracker.snapshot(Utc::now(), 10, 5).keys, 1);
    }

    #[tokio::test]
    async fn input_failure_aborts_startup() {
        let mut controller = SensingController::new();
        let err = controller
            .start_sensing(
                ActivityTracker::new(Utc::now()),
                Arc::new(FixedWindow),
                Box::new(Broken),
                classifier(),
                config(),
            )
            .unwrap_err();
        assert!(format!("{err:#}").contains("no permission"));
        assert!(!controller.is_active());
    }
}
