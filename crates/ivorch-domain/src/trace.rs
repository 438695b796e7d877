use serde::Serialize;

/// Ad-hoc structured trace events emitted across orchestrator crates for
/// observability. Distinct from `ivorch-eventbus`'s `EventKind`: these are
/// grep-friendly log lines, not the durable, ordered event log that
/// `spec.md` §6 fixes a schema for.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum OrchestratorEvent {
    SessionStateChanged {
        session_id: String,
        from: String,
        to: String,
    },
    NudgeEscalated {
        session_id: String,
        kind: String,
        intensity: String,
    },
    LieDetected {
        session_id: String,
        turn_seq: u64,
        confidence: f32,
    },
    EditorSelectorMiss {
        session_id: String,
        selector: String,
        consecutive_misses: u32,
    },
    AgentRetry {
        session_id: String,
        template: String,
        attempt: u32,
    },
    ProviderFallback {
        from_provider: String,
        to_provider: String,
        reason: String,
    },
}

impl OrchestratorEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ivorch_event");
    }
}
