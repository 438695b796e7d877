//! `ivorch run` — drives one interview session to completion from a
//! terminal (spec.md §4.1's `start`/`stop` lifecycle, §6's CLI surface).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ivorch_codemon::HttpEditorSurface;
use ivorch_domain::config::Config;
use ivorch_domain::model::{CandidateProfile, InterviewMode, SessionStatus};
use ivorch_eventbus::EventBus;
use ivorch_knowledge::KnowledgeBase;
use ivorch_session::{render_knowledge_context, SessionController, SessionDeps, SessionOutcome, SessionStore};

use crate::bootstrap::build_agent_runtime;
use crate::speech::{StdinSpeechSource, StdoutSpeechSink};

const EVENT_BUS_CAPACITY: usize = 256;

pub async fn run(
    config: Config,
    candidate_id: String,
    mode: InterviewMode,
    duration_secs: u64,
    question_id: String,
) -> anyhow::Result<SessionOutcome> {
    let data_root = PathBuf::from(&config.data.data_root);
    let kb = Arc::new(KnowledgeBase::build(&data_root, &candidate_id)?);
    tracing::info!(candidate_id, claims = kb.claims.len(), "knowledge base built");

    let agent = build_agent_runtime(&config)?;
    let (bus, bus_rx) = EventBus::new(EVENT_BUS_CAPACITY);
    let store = Arc::new(SessionStore::new(&data_root)?);

    if store.has_active()? {
        return Err(ivorch_domain::error::Error::AlreadyRunning.into());
    }

    let surface = HttpEditorSurface::new(Duration::from_millis(config.runtime.external_timeout_ms))?;
    let candidate = CandidateProfile { candidate_id: candidate_id.clone(), display_name: candidate_id };

    let deps = SessionDeps {
        bus: Arc::new(bus),
        bus_rx,
        agent,
        conversation_cfg: config.conversation.clone(),
        codemon_cfg: config.codemon.clone(),
        lie_cfg: config.lie.clone(),
        runtime_cfg: config.runtime.clone(),
        data_root,
        source: StdinSpeechSource::new(),
        sink: Arc::new(StdoutSpeechSink),
        surface,
        question_id,
        knowledge_context: render_knowledge_context(&kb),
        store: Some(store),
        // No CLI surface for spawning a subordinate interviewer process yet
        // (spec.md §6 doesn't name one); the bridge is wired and reachable
        // for embedders that populate `SessionDeps` directly.
        bridge_command: None,
    };

    let controller =
        SessionController::start(candidate, kb, mode, Duration::from_secs(duration_secs), deps).await?;
    println!("session {} started (Ctrl-C to stop)", controller.session_id());

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("stop requested, waiting for the session to wind down...");
                break controller.stop().await;
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                let view = controller.status();
                if matches!(view.status, SessionStatus::Ended | SessionStatus::Failed) {
                    break controller.stop().await;
                }
            }
        }
    };

    Ok(outcome)
}
