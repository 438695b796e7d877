//! Agent Runtime: provider fallback chain, schema-validated structured
//! calls, and per-session call serialization (spec.md §4.2, §6).

use std::collections::HashMap;
use std::sync::Arc;

use ivorch_domain::cancel::CancelToken;
use ivorch_domain::error::{Error, Result};
use ivorch_domain::trace::OrchestratorEvent;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex as AsyncMutex;

use crate::response::extract_json;
use crate::traits::{CompletionRequest, LlmProvider};

pub struct AgentRuntime {
    providers: Vec<Arc<dyn LlmProvider>>,
    schema_retries: u32,
    /// One call in flight per session at a time (spec.md §6): concurrent
    /// `ask`s for the same session would race on conversation state.
    call_locks: AsyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl AgentRuntime {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>, schema_retries: u32) -> Self {
        Self { providers, schema_retries, call_locks: AsyncMutex::new(HashMap::new()) }
    }

    async fn lock_for(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.call_locks.lock().await;
        locks.entry(session_id.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Ask every configured provider in order, retrying schema-invalid
    /// responses up to `schema_retries` times per provider before falling
    /// back to the next one. Fails with `Error::Protocol("LLM_INVALID")`
    /// once every provider is exhausted.
    pub async fn ask<T: DeserializeOwned>(
        &self,
        session_id: &str,
        req: &CompletionRequest,
        cancel: &CancelToken,
    ) -> Result<T> {
        let lock = self.lock_for(session_id).await;
        let _guard = lock.lock().await;

        if self.providers.is_empty() {
            return Err(Error::Config("no LLM providers configured".into()));
        }

        for (provider_idx, provider) in self.providers.iter().enumerate() {
            for attempt in 0..=self.schema_retries {
                if cancel.is_cancelled() {
                    return Err(Error::Protocol("cancelled".into()));
                }

                match provider.complete(req).await {
                    Ok(raw) => match serde_json::from_str::<T>(extract_json(&raw)) {
                        Ok(value) => return Ok(value),
                        Err(e) => {
                            tracing::warn!(
                                provider = provider.provider_id(),
                                attempt,
                                error = %e,
                                "structured response failed schema validation"
                            );
                            OrchestratorEvent::AgentRetry {
                                session_id: session_id.into(),
                                template: std::any::type_name::<T>().into(),
                                attempt,
                            }
                            .emit();
                        }
                    },
                    Err(e) if e.is_transient() => {
                        if let Some(next) = self.providers.get(provider_idx + 1) {
                            OrchestratorEvent::ProviderFallback {
                                from_provider: provider.provider_id().into(),
                                to_provider: next.provider_id().into(),
                                reason: e.to_string(),
                            }
                            .emit();
                        }
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        Err(Error::Protocol("LLM_INVALID".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        text: String,
    }

    struct FlakyProvider {
        id: &'static str,
        calls: AtomicUsize,
        responses: Vec<&'static str>,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        async fn complete(&self, _req: &CompletionRequest) -> Result<String> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.get(i).map(|s| s.to_string()).ok_or_else(|| {
                Error::Provider { provider: self.id.into(), message: "exhausted".into() }
            })
        }

        fn provider_id(&self) -> &str {
            self.id
        }
    }

    fn req() -> CompletionRequest {
        CompletionRequest {
            system_prompt: "sys".into(),
            user_prompt: "usr".into(),
            temperature: 0.2,
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn retries_then_succeeds_on_same_provider() {
        let provider = Arc::new(FlakyProvider {
            id: "p1",
            calls: AtomicUsize::new(0),
            responses: vec!["not json", "{\"text\":\"ok\"}"],
        });
        let runtime = AgentRuntime::new(vec![provider], 2);
        let result: Payload =
            runtime.ask("s1", &req(), &CancelToken::new()).await.expect("should succeed");
        assert_eq!(result, Payload { text: "ok".into() });
    }

    #[tokio::test]
    async fn falls_back_to_next_provider_on_transient_error() {
        let bad = Arc::new(FlakyProvider { id: "bad", calls: AtomicUsize::new(0), responses: vec![] });
        let good = Arc::new(FlakyProvider {
            id: "good",
            calls: AtomicUsize::new(0),
            responses: vec!["{\"text\":\"ok\"}"],
        });
        let runtime = AgentRuntime::new(vec![bad, good], 1);
        let result: Payload =
            runtime.ask("s1", &req(), &CancelToken::new()).await.expect("should fall back");
        assert_eq!(result.text, "ok");
    }

    #[tokio::test]
    async fn exhausting_every_provider_yields_llm_invalid() {
        let provider = Arc::new(FlakyProvider {
            id: "p1",
            calls: AtomicUsize::new(0),
            responses: vec!["not json", "still not json"],
        });
        let runtime = AgentRuntime::new(vec![provider], 1);
        let err = runtime.ask::<Payload>("s1", &req(), &CancelToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("LLM_INVALID"));
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_calling_provider() {
        let provider = Arc::new(FlakyProvider {
            id: "p1",
            calls: AtomicUsize::new(0),
            responses: vec!["{\"text\":\"ok\"}"],
        });
        let cancel = CancelToken::new();
        cancel.cancel();
        let runtime = AgentRuntime::new(vec![provider], 1);
        let err = runtime.ask::<Payload>("s1", &req(), &cancel).await.unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }
}
