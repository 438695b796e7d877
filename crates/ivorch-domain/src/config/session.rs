use serde::{Deserialize, Serialize};

/// Session-level timing (spec.md §6: `INTERVIEW_MAX_DURATION`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "d_max_duration_secs")]
    pub max_duration_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_duration_secs: d_max_duration_secs() }
    }
}

fn d_max_duration_secs() -> u64 {
    3600
}
