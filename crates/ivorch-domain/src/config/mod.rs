mod agent;
mod codemon;
mod conversation;
mod data;
mod lie;
mod observability;
mod runtime;
mod session;

pub use agent::*;
pub use codemon::*;
pub use conversation::*;
pub use data::*;
pub use lie::*;
pub use observability::*;
pub use runtime::*;
pub use session::*;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub codemon: CodemonConfig,
    #[serde(default)]
    pub lie: LieConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Load config from the path named by `IVORCH_CONFIG` (default
/// `config.toml`), falling back to defaults if the file is absent.
pub fn load_config() -> Result<(Config, String), Error> {
    let config_path = std::env::var("IVORCH_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("parsing {config_path}: {e}")))?
    } else {
        Config::default()
    };

    Ok((config, config_path))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. Empty vec
    /// means nothing to report.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.data.data_root.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "data.data_root".into(),
                message: "data_root must not be empty".into(),
            });
        }

        if !self.codemon.editor_url_template.contains("{session_id}") {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "codemon.editor_url_template".into(),
                message: "editor_url_template must contain a {session_id} placeholder".into(),
            });
        }

        if self.codemon.polling_interval_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "codemon.polling_interval_ms".into(),
                message: "polling_interval_ms must be greater than 0".into(),
            });
        }

        if self.codemon.selector_miss_limit == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "codemon.selector_miss_limit".into(),
                message: "selector_miss_limit must be greater than 0".into(),
            });
        }

        if !(0.0..=1.0).contains(&self.lie.lie_threshold) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "lie.lie_threshold".into(),
                message: format!(
                    "lie_threshold must be in [0.0, 1.0] (got {})",
                    self.lie.lie_threshold
                ),
            });
        }

        if !(0.0..=1.0).contains(&self.lie.oracle_relevance_threshold) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "lie.oracle_relevance_threshold".into(),
                message: "oracle_relevance_threshold must be in [0.0, 1.0]".into(),
            });
        }

        if !(0.0..=1.0).contains(&self.conversation.barge_in_confidence) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "conversation.barge_in_confidence".into(),
                message: "barge_in_confidence must be in [0.0, 1.0]".into(),
            });
        }

        if self.conversation.stt_reconnect_factor <= 1.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "conversation.stt_reconnect_factor".into(),
                message: "stt_reconnect_factor must be greater than 1.0 to back off".into(),
            });
        }

        if self.session.max_duration_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "session.max_duration_secs".into(),
                message: "max_duration_secs must be greater than 0".into(),
            });
        }

        if self.agent.providers.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "agent.providers".into(),
                message: "no LLM providers configured".into(),
            });
        }

        for (i, provider) in self.agent.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("agent.providers[{i}].id"),
                    message: "provider id must not be empty".into(),
                });
            }
            if !provider.base_url.starts_with("http://") && !provider.base_url.starts_with("https://")
            {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("agent.providers[{i}].base_url"),
                    message: format!(
                        "base_url must start with http:// or https:// (got \"{}\")",
                        provider.base_url
                    ),
                });
            }
            if provider.auth_env.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: format!("agent.providers[{i}].auth_env"),
                    message: "no auth_env configured; provider calls will fail authentication".into(),
                });
            }
        }

        errors
    }
}
