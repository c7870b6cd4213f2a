use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{AppCount, AppTime, PausePeriod, SessionStats};

use super::classifier::{AppCategory, AppClassifier};
use super::input::InputKind;

const MAX_SWITCH_SEQUENCE: usize = 50;
const RECENT_WINDOWS: usize = 10;

/// Cumulative counters written by the window observer and the input
/// collector. The reporting loop only reads them.
#[derive(Debug)]
struct ActivityState {
    session_start: DateTime<Utc>,
    active_window: Option<String>,
    last_switch_time: DateTime<Utc>,
    /// Closed-out foreground seconds; the open window is added on read.
    window_times: HashMap<String, f64>,
    window_open_count: HashMap<String, u64>,
    window_switches: u64,
    productive_switches: u64,
    switch_sequence: VecDeque<Option<String>>,
    key_presses: u64,
    mouse_moves: u64,
    mouse_clicks: u64,
    scroll_events: u64,
    click_per_app: HashMap<String, u64>,
    last_input_time: DateTime<Utc>,
    pause_started_at: Option<DateTime<Utc>>,
    pause_periods: Vec<PausePeriod>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PauseTransition {
    Unchanged,
    Started(DateTime<Utc>),
    Ended(PausePeriod),
}

/// What the live `update` packet needs each second.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActivitySnapshot {
    pub active_window: Option<String>,
    pub total_time_sec: u64,
    pub switches: u64,
    pub keys: u64,
    pub mouse: u64,
    pub is_inactive: bool,
    pub top_apps: Vec<(String, u64)>,
}

#[derive(Clone)]
pub struct ActivityTracker {
    inner: Arc<Mutex<ActivityState>>,
}

impl ActivityTracker {
    pub fn new(session_start: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ActivityState {
                session_start,
                active_window: None,
                last_switch_time: session_start,
                window_times: HashMap::new(),
                window_open_count: HashMap::new(),
                window_switches: 0,
                productive_switches: 0,
                switch_sequence: VecDeque::with_capacity(MAX_SWITCH_SEQUENCE),
                key_presses: 0,
                mouse_moves: 0,
                mouse_clicks: 0,
                scroll_events: 0,
                click_per_app: HashMap::new(),
                last_input_time: session_start,
                pause_started_at: None,
                pause_periods: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ActivityState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn active_window(&self) -> Option<String> {
        self.lock().active_window.clone()
    }

    /// Apply one observer poll. Returns true when the foreground changed.
    pub fn observe_window(
        &self,
        current: Option<String>,
        now: DateTime<Utc>,
        classifier: &AppClassifier,
    ) -> bool {
        let mut state = self.lock();
        if state.active_window == current {
            return false;
        }

        let previous = state.active_window.take();
        if let Some(last) = &previous {
            let elapsed = seconds_between(state.last_switch_time, now);
            *state.window_times.entry(last.clone()).or_insert(0.0) += elapsed;
        }

        if let Some(name) = &current {
            *state.window_open_count.entry(name.clone()).or_insert(0) += 1;
        }

        state.switch_sequence.push_back(current.clone());
        while state.switch_sequence.len() > MAX_SWITCH_SEQUENCE {
            state.switch_sequence.pop_front();
        }

        if previous.is_some() {
            let from = classifier.category(previous.as_deref());
            let to = classifier.category(current.as_deref());
            if from != to && from != AppCategory::Other && to != AppCategory::Other {
                state.productive_switches += 1;
            }
        }

        state.window_switches += 1;
        state.active_window = current;
        state.last_switch_time = now;
        true
    }

    pub fn record_input(&self, kind: InputKind, at: DateTime<Utc>) {
        let mut state = self.lock();
        match kind {
            InputKind::KeyPress => state.key_presses += 1,
            InputKind::MouseMove => state.mouse_moves += 1,
            InputKind::MouseClick => {
                state.mouse_clicks += 1;
                if let Some(window) = state.active_window.clone() {
                    *state.click_per_app.entry(window).or_insert(0) += 1;
                }
            }
            InputKind::Scroll => state.scroll_events += 1,
            InputKind::Activity => {}
        }
        if at > state.last_input_time {
            state.last_input_time = at;
        }
    }

    /// Open a pause once input has been silent past the threshold; close it
    /// on the first poll after input resumes.
    pub fn update_pause(&self, now: DateTime<Utc>, idle_threshold_secs: u64) -> PauseTransition {
        let mut state = self.lock();
        let idle = seconds_between(state.last_input_time, now);

        if idle > idle_threshold_secs as f64 {
            if state.pause_started_at.is_none() {
                let started = state.last_input_time;
                state.pause_started_at = Some(started);
                return PauseTransition::Started(started);
            }
            return PauseTransition::Unchanged;
        }

        match state.pause_started_at.take() {
            Some(started) => {
                let period = PausePeriod::new(started, now);
                state.pause_periods.push(period.clone());
                PauseTransition::Ended(period)
            }
            None => PauseTransition::Unchanged,
        }
    }

    pub fn is_inactive(&self, now: DateTime<Utc>, idle_threshold_secs: u64) -> bool {
        seconds_between(self.lock().last_input_time, now) > idle_threshold_secs as f64
    }

    pub fn snapshot(
        &self,
        now: DateTime<Utc>,
        idle_threshold_secs: u64,
        top_apps_limit: usize,
    ) -> ActivitySnapshot {
        let state = self.lock();
        ActivitySnapshot {
            active_window: state.active_window.clone(),
            total_time_sec: seconds_between(state.session_start, now) as u64,
            switches: state.window_switches,
            keys: state.key_presses,
            mouse: state.mouse_moves,
            is_inactive: seconds_between(state.last_input_time, now) > idle_threshold_secs as f64,
            top_apps: ranked_times(&state, now, top_apps_limit),
        }
    }

    /// Freeze the counters into end-of-session statistics. A pause still
    /// open at `now` counts as ending now.
    pub fn stats(
        &self,
        now: DateTime<Utc>,
        focus_score: u8,
        total_distraction_time: u64,
        top_apps_limit: usize,
    ) -> SessionStats {
        let state = self.lock();
        let mut pauses = state.pause_periods.clone();
        if let Some(started) = state.pause_started_at {
            pauses.push(PausePeriod::new(started, now));
        }

        SessionStats {
            duration_seconds: seconds_between(state.session_start, now) as u64,
            total_switches: state.window_switches,
            productive_switches: state.productive_switches,
            focus_score,
            top_apps: ranked_times(&state, now, top_apps_limit)
                .into_iter()
                .map(|(name, seconds)| AppTime { name, seconds })
                .collect(),
            total_distraction_time,
            pause_count: pauses.len(),
            total_pause_seconds: pauses.iter().map(|p| p.duration_secs).sum(),
            key_presses: state.key_presses,
            mouse_clicks: state.mouse_clicks,
            mouse_moves: state.mouse_moves,
            scroll_events: state.scroll_events,
            recent_windows: recent_windows(&state.switch_sequence, RECENT_WINDOWS),
            most_clicked: leader(&state.click_per_app),
            most_opened: leader(&state.window_open_count),
        }
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    ((to - from).num_milliseconds() as f64 / 1000.0).max(0.0)
}

/// The last `limit` windows switched to, skipping gaps with no window.
fn recent_windows(sequence: &VecDeque<Option<String>>, limit: usize) -> Vec<String> {
    let mut recent: Vec<String> = sequence.iter().rev().flatten().take(limit).cloned().collect();
    recent.reverse();
    recent
}

/// Highest count; ties go to the alphabetically first name.
fn leader(counts: &HashMap<String, u64>) -> Option<AppCount> {
    counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(name, count)| AppCount {
            name: name.clone(),
            count: *count,
        })
}

fn ranked_times(state: &ActivityState, now: DateTime<Utc>, limit: usize) -> Vec<(String, u64)> {
    let mut times = state.window_times.clone();
    if let Some(current) = &state.active_window {
        *times.entry(current.clone()).or_insert(0.0) +=
            seconds_between(state.last_switch_time, now);
    }

    let mut ranked: Vec<(String, f64)> = times.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(name, seconds)| (name, seconds as u64))
        .collect()
}
