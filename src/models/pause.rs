use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A closed stretch of input inactivity longer than the idle threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PausePeriod {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: u64,
}

impl PausePeriod {
    pub fn new(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Self {
        let duration_secs = (ended_at - started_at).num_seconds().max(0) as u64;
        Self {
            started_at,
            ended_at,
            duration_secs,
        }
    }
}
