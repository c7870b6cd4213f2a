use serde::{Deserialize, Serialize};

use crate::settings::ClassificationSettings;
use crate::utils::text::contains_ci;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppCategory {
    Productive,
    Distracting,
    Other,
}

/// Decides what a window name means for focus.
#[derive(Debug, Clone)]
pub struct AppClassifier {
    productive: Vec<String>,
    distracting: Vec<String>,
    browsers: Vec<String>,
    browser_distractions: Vec<String>,
    system_processes: Vec<String>,
    self_markers: Vec<String>,
}

impl AppClassifier {
    pub fn new(settings: &ClassificationSettings) -> Self {
        Self {
            productive: settings.productive_apps.clone(),
            distracting: settings.distracting_apps.clone(),
            browsers: settings.browser_apps.clone(),
            browser_distractions: settings.browser_distractions.clone(),
            system_processes: settings.system_processes.clone(),
            self_markers: settings.self_markers.clone(),
        }
    }

    /// Anything the user names in their goal stops counting as a distraction:
    /// standalone apps become productive, browser sites become neutral.
    pub fn with_goal_overrides(mut self, goal: &str) -> Self {
        let (allowed, still_distracting): (Vec<String>, Vec<String>) = self
            .distracting
            .into_iter()
            .partition(|app| contains_ci(goal, app));
        for app in &allowed {
            log_info!("goal mentions {app}; treating it as productive");
        }
        self.distracting = still_distracting;
        self.productive.extend(allowed);

        self.browser_distractions.retain(|site| {
            let mentioned = contains_ci(goal, site);
            if mentioned {
                log_info!("goal mentions {site}; allowing it in the browser");
            }
            !mentioned
        });
        self
    }

    /// OS shell surfaces, blank names, and screen-sharing banners are not
    /// real foreground work.
    pub fn is_system_window(&self, name: &str) -> bool {
        let trimmed = name.trim();
        if trimmed.chars().count() < 2 {
            return true;
        }
        if contains_ci(trimmed, "is sharing your screen")
            || contains_ci(trimmed, "compartiendo tu pantalla")
        {
            return true;
        }
        self.system_processes
            .iter()
            .any(|process| contains_ci(trimmed, process))
    }

    pub fn filter_window(&self, raw: Option<String>) -> Option<String> {
        raw.map(|name| name.trim().to_string())
            .filter(|name| !self.is_system_window(name))
    }

    pub fn is_browser(&self, window: &str) -> bool {
        self.browsers.iter().any(|browser| contains_ci(window, browser))
    }

    pub fn is_distracted(&self, window: &str) -> bool {
        if self.distracting.iter().any(|app| contains_ci(window, app)) {
            return true;
        }
        self.is_browser(window)
            && self
                .browser_distractions
                .iter()
                .any(|site| contains_ci(window, site))
    }

    pub fn category(&self, window: Option<&str>) -> AppCategory {
        let Some(window) = window else {
            return AppCategory::Other;
        };
        if self.is_distracted(window) {
            AppCategory::Distracting
        } else if self.productive.iter().any(|app| contains_ci(window, app)) {
            AppCategory::Productive
        } else {
            AppCategory::Other
        }
    }

    pub fn is_self_window(&self, window: &str) -> bool {
        self.self_markers
            .iter()
            .any(|marker| contains_ci(window, marker))
    }

    /// Shorten a raw window title to the known distraction it contains,
    /// e.g. "(3) YouTube - Google Chrome" becomes "YouTube".
    pub fn clean_name(&self, window: &str) -> String {
        self.distracting
            .iter()
            .chain(self.browser_distractions.iter())
            .find(|known| contains_ci(window, known))
            .cloned()
            .unwrap_or_else(|| window.to_string())
    }
}
