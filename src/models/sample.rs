use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One polling tick worth of observation. Consumed by the chunk aggregator
/// and never retained individually.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub active_window: Option<String>,
    pub is_distracted: bool,
}
