use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Period between status requests
    pub interval_ms: u64,
    /// Give up on the job after this long, whatever the backend says
    pub timeout_secs: u64,
    /// Consecutive 404s before the job is considered lost
    pub max_not_found: u32,
    /// Consecutive non-404 failures tolerated; `None` keeps polling forever
    pub max_transient_failures: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            timeout_secs: 20 * 60,
            max_not_found: 5,
            max_transient_failures: None,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        // a zero period would make tokio::time::interval panic
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Timeout for user-facing text: whole minutes when it divides evenly,
    /// seconds otherwise.
    pub fn timeout_label(&self) -> String {
        let secs = self.timeout_secs;
        match (secs % 60, secs / 60) {
            (0, 1) => "1 minute".to_string(),
            (0, minutes) if minutes > 0 => format!("{} minutes", minutes),
            _ if secs == 1 => "1 second".to_string(),
            _ => format!("{} seconds", secs),
        }
    }
}
