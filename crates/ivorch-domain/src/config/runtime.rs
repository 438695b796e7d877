use serde::{Deserialize, Serialize};

/// Cross-cutting runtime timeouts shared by every task in a session
/// (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Timeout applied to external calls without a more specific timeout
    /// (editor polling, STT/TTS provider I/O).
    #[serde(default = "d_external_timeout_ms")]
    pub external_timeout_ms: u64,
    /// Grace period given to owned tasks to observe cancellation and
    /// finish cleanly before the session is force-ended.
    #[serde(default = "d_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    /// Interval between checks of a long-lived cancellation token.
    #[serde(default = "d_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            external_timeout_ms: d_external_timeout_ms(),
            shutdown_grace_ms: d_shutdown_grace_ms(),
            poll_timeout_ms: d_poll_timeout_ms(),
        }
    }
}

fn d_external_timeout_ms() -> u64 {
    10_000
}
fn d_shutdown_grace_ms() -> u64 {
    5_000
}
fn d_poll_timeout_ms() -> u64 {
    250
}
