use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use std::process::{Command, Stdio};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::activity::ActivityTracker;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Kind of raw input observed. `Activity` is for collectors that can only
/// tell that *something* happened, not what.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    KeyPress,
    MouseMove,
    MouseClick,
    Scroll,
    Activity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub at: DateTime<Utc>,
}

impl InputEvent {
    pub fn now(kind: InputKind) -> Self {
        Self {
            kind,
            at: Utc::now(),
        }
    }
}

pub type InputSender = mpsc::UnboundedSender<InputEvent>;

/// Something that produces input events until cancelled. Starting is the one
/// capability the session cannot run without, so `start` must fail loudly.
pub trait InputSource: Send {
    fn name(&self) -> &'static str;

    fn start(
        self: Box<Self>,
        events: InputSender,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>>;
}

/// Drains input events into the tracker. All counter writes from input
/// collectors go through here, one at a time.
pub async fn input_collector_loop(
    mut events: mpsc::UnboundedReceiver<InputEvent>,
    tracker: ActivityTracker,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(event) => tracker.record_input(event.kind, event.at),
                    None => {
                        log_info!("input channel closed");
                        break;
                    }
                }
            }
            _ = cancel.cancelled() => {
                log_info!("input collector shutting down");
                break;
            }
        }
    }
}

/// Watches the OS idle counter (`ioreg` HIDIdleTime on macOS, `xprintidle`
/// on X11) and reports activity whenever it resets.
pub struct IdleProbeSource {
    poll: Duration,
}

impl IdleProbeSource {
    pub fn new(poll: Duration) -> Self {
        Self { poll }
    }
}

impl Default for IdleProbeSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl InputSource for IdleProbeSource {
    fn name(&self) -> &'static str {
        "os-idle-probe"
    }

    fn start(
        self: Box<Self>,
        events: InputSender,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>> {
        let initial = query_idle_ms().context("input collection is unavailable on this system")?;
        log_info!("idle probe ready (current idle {}ms)", initial);

        let poll = self.poll;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_idle_ms = initial;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let idle = tokio::task::spawn_blocking(query_idle_ms).await;
                        match idle {
                            Ok(Ok(idle_ms)) => {
                                if input_happened(last_idle_ms, idle_ms, poll) {
                                    let at = Utc::now()
                                        - chrono::Duration::milliseconds(idle_ms as i64);
                                    if events.send(InputEvent { kind: InputKind::Activity, at }).is_err() {
                                        break;
                                    }
                                }
                                last_idle_ms = idle_ms;
                            }
                            Ok(Err(err)) => log_debug!("idle probe failed: {err:#}"),
                            Err(err) => log_warn!("idle probe worker join failed: {err}"),
                        }
                    }
                    _ = cancel.cancelled() => break,
                }
            }
        });

        Ok(handle)
    }
}

/// Idle time going down, or staying under one poll, means the user did
/// something since the last look.
fn input_happened(last_idle_ms: u64, idle_ms: u64, poll: Duration) -> bool {
    idle_ms < last_idle_ms || idle_ms < poll.as_millis() as u64
}

fn query_idle_ms() -> Result<u64> {
    if cfg!(target_os = "macos") {
        let stdout = run_probe("ioreg", &["-c", "IOHIDSystem"])?;
        parse_ioreg_idle(&stdout).ok_or_else(|| anyhow!("HIDIdleTime missing from ioreg output"))
    } else if cfg!(target_os = "linux") {
        let stdout = run_probe("xprintidle", &[])?;
        stdout
            .trim()
            .parse::<u64>()
            .with_context(|| format!("unexpected xprintidle output '{}'", stdout.trim()))
    } else {
        bail!("no idle probe for this platform")
    }
}

fn run_probe(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .with_context(|| format!("failed to run {program}"))?;
    if !output.status.success() {
        bail!("{program} exited with {}", output.status);
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `"HIDIdleTime" = 1234567890` is in nanoseconds.
fn parse_ioreg_idle(output: &str) -> Option<u64> {
    output
        .lines()
        .find(|line| line.contains("\"HIDIdleTime\""))
        .and_then(|line| line.split('=').nth(1))
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|nanos| nanos / 1_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_ioreg_idle_time() {
        let output = r#"
    | |   "HIDIdleTimeDelta" = 12
    | |   "HIDIdleTime" = 2500000000
    | |   "HIDKeyboardModifierMappingPairs" = ()
"#;
        assert_eq!(parse_ioreg_idle(output), Some(2500));
        assert_eq!(parse_ioreg_idle("nothing here"), None);
    }

    #[test]
    fn idle_reset_counts_as_input() {
        let poll = Duration::from_millis(500);
        assert!(input_happened(9_000, 120, poll));
        assert!(input_happened(300, 400, poll));
        assert!(!input_happened(9_000, 9_500, poll));
    }

    #[tokio::test]
    async fn collector_routes_events_into_tracker() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let tracker = ActivityTracker::new(start);
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        for kind in [InputKind::KeyPress, InputKind::KeyPress, InputKind::MouseMove] {
            tx.send(InputEvent { kind, at: start }).unwrap();
        }
        drop(tx);

        input_collector_loop(rx, tracker.clone(), cancel).await;

        let snapshot = tracker.snapshot(start, 10, 5);
        assert_eq!(snapshot.keys, 2);
        assert_eq!(snapshot.mouse, 1);
    }
}
