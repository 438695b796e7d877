//! Config loading and provider-registry construction shared by every
//! subcommand (teacher idiom: `sa_gateway::cli::load_config` +
//! `main.rs`'s provider-registry block, one central place so `run` and a
//! future `doctor`-style check don't duplicate it).

use std::sync::Arc;

use anyhow::{bail, Context};
use ivorch_agent::anthropic::AnthropicProvider;
use ivorch_agent::openai_compat::OpenAiCompatProvider;
use ivorch_agent::{AgentRuntime, LlmProvider};
use ivorch_domain::config::{Config, ConfigSeverity, ProviderKind};

/// Load the configuration named by `IVORCH_CONFIG` and fail fast on any
/// `ConfigSeverity::Error` issue (spec.md §7: "configuration — missing
/// endpoints, invalid templates — fail fast at start").
pub fn load_and_validate_config() -> anyhow::Result<Config> {
    let (config, path) = ivorch_domain::config::load_config().context("loading config")?;

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!(config_path = %path, "{issue}"),
            ConfigSeverity::Error => tracing::error!(config_path = %path, "{issue}"),
        }
    }
    let error_count = issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count();
    if error_count > 0 {
        bail!("config validation failed with {error_count} error(s); see log for details");
    }

    Ok(config)
}

/// Build one `AgentRuntime` from the configured provider chain, in
/// config order (spec.md §4.2 fallback order).
pub fn build_agent_runtime(config: &Config) -> anyhow::Result<Arc<AgentRuntime>> {
    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();
    for provider_cfg in &config.agent.providers {
        let provider: Arc<dyn LlmProvider> = match provider_cfg.kind {
            ProviderKind::Anthropic => {
                Arc::new(AnthropicProvider::from_config(provider_cfg, config.agent.llm_timeout_ms)?)
            }
            ProviderKind::OpenaiCompat => {
                Arc::new(OpenAiCompatProvider::from_config(provider_cfg, config.agent.llm_timeout_ms)?)
            }
        };
        providers.push(provider);
    }
    Ok(Arc::new(AgentRuntime::new(providers, config.agent.llm_schema_retries)))
}

pub fn init_tracing(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.observability.log_filter.clone()));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.observability.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
