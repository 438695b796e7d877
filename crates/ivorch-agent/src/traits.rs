use ivorch_domain::error::Result;

/// A provider-agnostic single-turn completion request. The orchestrator
/// never needs multi-turn chat history at the provider boundary — each
/// call's prompt already embeds whatever context the caller (Conversation
/// Loop, Lie Detector, Consolidator) assembled.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait every LLM adapter implements. Deliberately narrower than a full
/// chat/tool-calling surface — the orchestrator only ever needs "ask a
/// question, get text back" (the Agent Runtime handles JSON-schema
/// enforcement on top of this).
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, req: &CompletionRequest) -> Result<String>;

    fn provider_id(&self) -> &str;
}
