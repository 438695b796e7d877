use serde::{Deserialize, Serialize};

/// Logging configuration (`tracing-subscriber` filter/format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `tracing_subscriber::EnvFilter` directive, e.g. "info" or
    /// "ivorch_session=debug,info".
    #[serde(default = "d_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: d_log_filter(),
            json_logs: false,
        }
    }
}

fn d_log_filter() -> String {
    "info".into()
}
