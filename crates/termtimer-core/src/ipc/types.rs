//! Shared wire types for daemon IPC.
//!
//! Requests and replies on `/request` are plain UTF-8 text; these types
//! cover the JSON payloads (the `list` reply and the health probe).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Timer;

/// Reply that tells the client the daemon is going away.
pub const SHUTDOWN_SENTINEL: &str = "bye.";

/// One `list` record: `[identity, description, expiry as epoch seconds]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerRecord(pub String, pub String, pub f64);

impl TimerRecord {
    pub fn identity(&self) -> &str {
        &self.0
    }

    pub fn description(&self) -> &str {
        &self.1
    }

    /// Expiry instant, or `None` if the seconds value is out of range.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        if !self.2.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis((self.2 * 1000.0).round() as i64)
    }
}

impl From<&Timer> for TimerRecord {
    fn from(timer: &Timer) -> Self {
        Self(
            timer.id.to_string(),
            timer.description.clone(),
            timer.expiry.timestamp_millis() as f64 / 1000.0,
        )
    }
}

/// Daemon health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub git_hash: String,
    pub build_profile: String,
    pub pid: u32,
    pub uptime_secs: u64,
}

/// Generic error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
