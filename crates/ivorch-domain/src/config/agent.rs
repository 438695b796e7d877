use serde::{Deserialize, Serialize};

/// Agent Runtime configuration: LLM provider list and structured-call
/// policy (spec.md §3, §4, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "d_llm_timeout_ms")]
    pub llm_timeout_ms: u64,
    /// Retries on schema-invalid structured responses before `LLM_INVALID`.
    #[serde(default = "d_llm_schema_retries")]
    pub llm_schema_retries: u32,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            llm_timeout_ms: d_llm_timeout_ms(),
            llm_schema_retries: d_llm_schema_retries(),
            providers: Vec::new(),
        }
    }
}

/// One configured LLM provider, tried in list order until one succeeds
/// (spec.md §4.2's provider-fallback behavior).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    pub default_model: String,
    /// Env var holding the API key.
    pub auth_env: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Anthropic,
    OpenaiCompat,
}

fn d_llm_timeout_ms() -> u64 {
    20_000
}
fn d_llm_schema_retries() -> u32 {
    2
}
