//! Session Controller: the state machine that owns one interview from
//! `start` to a final Outcome (spec.md §4.1), spawning the Conversation
//! Loop and Code Monitor and wiring the Lie-Detection Engine's nudges
//! back into the conversation.
//!
//! `start`/`stop`/`status` are written as in-process calls; a separate
//! `ivorch-cli` process talks to a running controller through
//! [`crate::store::SessionStore`] instead (its `.stop` flag files and
//! session records), which this module polls every tick alongside its
//! own [`CancelToken`].

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex as SyncMutex;

use ivorch_agent::AgentRuntime;
use ivorch_codemon::{CodeMonitor, CodemonOutcome, EditorSurface};
use ivorch_consolidator::{consolidate, ConsolidationInputs, OutcomeWriter};
use ivorch_conversation::speech::{SpeechSink, SpeechSource};
use ivorch_conversation::{new_nudge_queue, ConversationLoop, ConversationOutcome, PendingNudge};
use ivorch_domain::cancel::{CancelMap, CancelToken};
use ivorch_domain::config::{CodemonConfig, ConversationConfig, LieConfig, RuntimeConfig};
use ivorch_domain::error::{Error, Result};
use ivorch_domain::model::{
    CandidateProfile, CodeSnapshotsSummary, CompletionReason, ConversationTurn, InterviewMode,
    NudgeIntensity, NudgeKind, NudgeRecord, Session, SessionStatus, TestState, TurnRole,
};
use ivorch_domain::trace::OrchestratorEvent;
use ivorch_eventbus::{EventBus, EventKind, EventLogWriter, Producer, SubprocessBridge};
use ivorch_knowledge::KnowledgeBase;
use ivorch_lie::{CheckOutcome, LieEngine};

use crate::store::SessionStore;
use crate::transcript::TranscriptWriter;

/// Enforces "a session already active in this process" (spec.md §4.1).
/// Deliberately process-wide rather than per-`SessionStore`: two
/// controllers in the same binary sharing one `data_root` must still
/// collide.
static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

/// The lightweight, session-level result of `stop`. Distinct from the
/// fully-scored Outcome document the Log Consolidator produces later —
/// this only reports how the session itself ended.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub session_id: String,
    pub status: SessionStatus,
    pub completion_reason: Option<CompletionReason>,
    pub error: Option<String>,
}

/// A `status` snapshot (spec.md §4.1).
#[derive(Debug, Clone)]
pub struct SessionStatusView {
    pub status: SessionStatus,
    pub elapsed: ChronoDuration,
    pub remaining: ChronoDuration,
    pub last_event: Option<String>,
}

/// Everything a controller needs to drive one session, gathered in one
/// place so `start` doesn't take a dozen positional arguments.
pub struct SessionDeps<Src, Sink, E> {
    pub bus: Arc<EventBus>,
    pub bus_rx: tokio::sync::mpsc::Receiver<ivorch_eventbus::EventEnvelope>,
    pub agent: Arc<AgentRuntime>,
    pub conversation_cfg: ConversationConfig,
    pub codemon_cfg: CodemonConfig,
    pub lie_cfg: LieConfig,
    pub runtime_cfg: RuntimeConfig,
    pub data_root: PathBuf,
    pub source: Src,
    pub sink: Arc<Sink>,
    pub surface: E,
    pub question_id: String,
    /// Rendered knowledge-base context handed to the Conversation Loop's
    /// prompt builder (see [`render_knowledge_context`]).
    pub knowledge_context: String,
    /// When set, the controller also persists session records and polls
    /// for out-of-process stop requests (spec.md §4.1's `stop` API used
    /// from a separate `ivorch-cli` invocation).
    pub store: Option<Arc<SessionStore>>,
    /// When set, the controller spawns this subordinate process and
    /// bridges its NDJSON stdout onto the event bus for the session's
    /// duration (spec.md §4.7's external process bridge).
    pub bridge_command: Option<(String, Vec<String>)>,
}

/// A short line-item digest of a candidate's strongest claims, injected
/// into the interviewer's system prompt (spec.md §4.2's "knowledge
/// context").
pub fn render_knowledge_context(kb: &KnowledgeBase) -> String {
    let mut lines: Vec<String> = kb
        .claims
        .iter()
        .map(|c| format!("- [{:?}] {} (confidence {:.2})", c.category, c.text, c.confidence))
        .collect();
    lines.sort();
    lines.join("\n")
}

/// A handle to a running session. Cheap to clone; every clone observes
/// the same underlying state.
#[derive(Clone, Debug)]
pub struct SessionController {
    session_id: String,
    session: Arc<SyncMutex<Session>>,
    session_cancel: CancelToken,
    outcome: Arc<SyncMutex<Option<SessionOutcome>>>,
}

impl SessionController {
    /// Start a new session and spawn its owned tasks. Fails
    /// `AlreadyRunning` if a session is active in this process, or
    /// `InvalidInput` if `duration` doesn't place the deadline in the
    /// future.
    pub async fn start<Src, Sink, E>(
        candidate: CandidateProfile,
        kb: Arc<KnowledgeBase>,
        mode: InterviewMode,
        duration: StdDuration,
        deps: SessionDeps<Src, Sink, E>,
    ) -> Result<Self>
    where
        Src: SpeechSource + 'static,
        Sink: SpeechSink + 'static,
        E: EditorSurface + 'static,
    {
        if SESSION_ACTIVE.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(Error::AlreadyRunning);
        }

        let now = Utc::now();
        let span = match ChronoDuration::from_std(duration) {
            Ok(span) => span,
            Err(e) => {
                SESSION_ACTIVE.store(false, Ordering::SeqCst);
                return Err(Error::InvalidInput(format!("duration out of range: {e}")));
            }
        };
        let deadline = now + span;
        if deadline <= now {
            SESSION_ACTIVE.store(false, Ordering::SeqCst);
            return Err(Error::InvalidInput("duration must place the deadline in the future".into()));
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(session_id.clone(), candidate, mode, now, deadline);
        let session = Arc::new(SyncMutex::new(session));

        let cancel_map = Arc::new(CancelMap::new());
        let session_cancel = cancel_map.register(&session_id);
        let outcome: Arc<SyncMutex<Option<SessionOutcome>>> = Arc::new(SyncMutex::new(None));

        if let Some(store) = &deps.store {
            store.save(&session.lock())?;
        }

        let controller = Self {
            session_id: session_id.clone(),
            session: session.clone(),
            session_cancel: session_cancel.clone(),
            outcome: outcome.clone(),
        };

        tokio::spawn(run_session(session_id, session, cancel_map, session_cancel, outcome, kb, deps));

        Ok(controller)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self) -> SessionStatusView {
        let now = Utc::now();
        let s = self.session.lock();
        SessionStatusView {
            status: s.status,
            elapsed: s.elapsed(now),
            remaining: s.remaining(now),
            last_event: s.last_event.clone(),
        }
    }

    /// Signal the session to stop and wait for its final Outcome.
    /// Idempotent: a second call (concurrent or later) observes the same
    /// recorded Outcome instead of re-running teardown.
    pub async fn stop(&self) -> SessionOutcome {
        if let Some(existing) = self.outcome.lock().clone() {
            return existing;
        }
        self.session_cancel.cancel();
        loop {
            if let Some(existing) = self.outcome.lock().clone() {
                return existing;
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }
    }
}

/// Composes the spoken nudge for editor stasis (spec.md §4.3's `INACTIVITY`
/// event), escalating in tone the same way the Lie-Detection Engine's
/// category nudges do but without reference to a claim.
fn compose_inactivity_nudge_text(elapsed_ms: u64, intensity: NudgeIntensity) -> String {
    let elapsed_s = elapsed_ms / 1000;
    match intensity {
        NudgeIntensity::Polite => "I notice the editor's been quiet for a bit — want to talk through your approach?".into(),
        NudgeIntensity::Firm => format!("It's been about {elapsed_s}s without any code changes. What are you thinking through right now?"),
        NudgeIntensity::Aggressive => {
            format!("We're {elapsed_s}s in without progress in the editor. Let's narrow the problem down together.")
        }
        NudgeIntensity::FinalWarning => {
            "We need to move forward — please share whatever partial solution you have, even if it's incomplete.".into()
        }
    }
}

fn event_label(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::SessionStarted { .. } => "session_started",
        EventKind::SessionEnded { .. } => "session_ended",
        EventKind::TurnCandidate { .. } => "turn_candidate",
        EventKind::TurnInterviewer { .. } => "turn_interviewer",
        EventKind::NudgeRequired { .. } => "nudge_required",
        EventKind::NudgeDelivered { .. } => "nudge_delivered",
        EventKind::LieDetected { .. } => "lie_detected",
        EventKind::CodeChanged { .. } => "code_changed",
        EventKind::Inactivity { .. } => "inactivity",
        EventKind::SubmitDetected { .. } => "submit_detected",
        EventKind::TestResult { .. } => "test_result",
        EventKind::SystemWarning { .. } => "system_warning",
        EventKind::SystemError { .. } => "system_error",
    }
}

fn transition(session: &Arc<SyncMutex<Session>>, session_id: &str, to: SessionStatus) -> Result<()> {
    let mut s = session.lock();
    if !s.status.can_transition_to(to) {
        return Err(Error::ContractViolation(format!("illegal transition {:?} -> {to:?}", s.status)));
    }
    OrchestratorEvent::SessionStateChanged {
        session_id: session_id.to_string(),
        from: format!("{:?}", s.status).to_lowercase(),
        to: format!("{to:?}").to_lowercase(),
    }
    .emit();
    s.status = to;
    Ok(())
}

/// Accumulates the Code Monitor's event-stream footprint over a session,
/// so the Log Consolidator gets a `CodeSnapshotsSummary` without having
/// to re-read the event log itself (spec.md §4.8 inputs).
#[derive(Default)]
struct CodeTrack {
    sampled: usize,
    final_question_id: Option<String>,
    final_test_state: TestState,
    test_state_history: Vec<TestState>,
}

async fn run_session<Src, Sink, E>(
    session_id: String,
    session: Arc<SyncMutex<Session>>,
    cancel_map: Arc<CancelMap>,
    session_cancel: CancelToken,
    outcome_slot: Arc<SyncMutex<Option<SessionOutcome>>>,
    kb: Arc<KnowledgeBase>,
    deps: SessionDeps<Src, Sink, E>,
) where
    Src: SpeechSource + 'static,
    Sink: SpeechSink + 'static,
    E: EditorSurface + 'static,
{
    let store = deps.store.clone();
    let data_root = deps.data_root.clone();
    let mut lie_engine =
        LieEngine::new(session_id.clone(), deps.bus.clone(), deps.agent.clone(), deps.lie_cfg.clone(), kb.clone());
    let mut turns: Vec<ConversationTurn> = Vec::new();
    let mut code_track = CodeTrack::default();
    let mut delivered_nudges: Vec<NudgeRecord> = Vec::new();

    let result = drive_session(
        &session_id,
        &session,
        &cancel_map,
        &session_cancel,
        &mut lie_engine,
        &mut turns,
        &mut code_track,
        &mut delivered_nudges,
        deps,
    )
    .await;

    // Always cancel, even on an early `?` bail-out — otherwise a
    // contract-violation abort would leave the conversation/codemon
    // tasks running forever with nothing left to drain their output.
    session_cancel.cancel();

    let (status, reason, error) = match result {
        Ok((status, reason)) => (status, reason, None),
        Err(e) => (SessionStatus::Failed, None, Some(e.to_string())),
    };

    {
        let mut s = session.lock();
        if s.status.can_transition_to(status) || s.status == status {
            s.status = status;
        }
        s.completion_reason = reason;
        s.error = error.clone();
    }

    // The Log Consolidator always runs, even on a failed session, and
    // produces a best-effort Outcome with a non-empty `error` (spec.md
    // §4.8, §7).
    lie_engine.end_session();
    let (candidate, started_at) = {
        let s = session.lock();
        (s.candidate.clone(), s.started_at)
    };
    let outcome_doc = consolidate(ConsolidationInputs {
        session_id: session_id.clone(),
        candidate,
        started_at,
        ended_at: Utc::now(),
        turns,
        lies: lie_engine.lies().to_vec(),
        code_snapshots_summary: CodeSnapshotsSummary {
            sampled: code_track.sampled,
            final_question_id: code_track.final_question_id,
            final_test_state: code_track.final_test_state,
            test_state_history: code_track.test_state_history,
        },
        claims: kb.claims.clone(),
        knowledge_base_digest: kb.digest(),
        event_log_path: EventLogWriter::new(&data_root).path_for(&session_id).display().to_string(),
        delivered_nudges,
        error: error.clone(),
    });
    if let Err(e) = OutcomeWriter::new(&data_root).write(&outcome_doc) {
        tracing::warn!(session_id, error = %e, "failed to persist outcome document");
    }

    if let Some(store) = &store {
        let _ = store.save(&session.lock());
        let _ = store.clear_stop_flag(&session_id);
    }

    cancel_map.remove(&session_id);
    *outcome_slot.lock() = Some(SessionOutcome { session_id, status, completion_reason: reason, error });
    SESSION_ACTIVE.store(false, Ordering::SeqCst);
}

async fn drive_session<Src, Sink, E>(
    session_id: &str,
    session: &Arc<SyncMutex<Session>>,
    cancel_map: &Arc<CancelMap>,
    session_cancel: &CancelToken,
    lie_engine: &mut LieEngine,
    turns_out: &mut Vec<ConversationTurn>,
    code_track: &mut CodeTrack,
    delivered_nudges_out: &mut Vec<NudgeRecord>,
    deps: SessionDeps<Src, Sink, E>,
) -> Result<(SessionStatus, Option<CompletionReason>)>
where
    Src: SpeechSource + 'static,
    Sink: SpeechSink + 'static,
    E: EditorSurface + 'static,
{
    transition(session, session_id, SessionStatus::Collecting)?;
    transition(session, session_id, SessionStatus::Ready)?;
    transition(session, session_id, SessionStatus::Active)?;

    let candidate_id = session.lock().candidate.candidate_id.clone();
    deps.bus
        .publish(Producer::Controller, EventKind::SessionStarted { session_id: session_id.to_string(), candidate_id });

    let conv_key = format!("{session_id}:conversation");
    let mon_key = format!("{session_id}:codemon");
    let lie_key = format!("{session_id}:lie");
    let conv_cancel = cancel_map.register(&conv_key);
    cancel_map.add_to_group(session_id, &conv_key);
    let mon_cancel = cancel_map.register(&mon_key);
    cancel_map.add_to_group(session_id, &mon_key);
    let lie_cancel = cancel_map.register(&lie_key);
    cancel_map.add_to_group(session_id, &lie_key);

    if let Some((command, args)) = &deps.bridge_command {
        let bridge_key = format!("{session_id}:bridge");
        let bridge_cancel = cancel_map.register(&bridge_key);
        cancel_map.add_to_group(session_id, &bridge_key);
        match SubprocessBridge::spawn(session_id, command, args) {
            Ok(bridge) => {
                let bus = deps.bus.clone();
                let session_id = session_id.to_string();
                tokio::spawn(async move {
                    if let Err(e) = bridge.run(&bus, bridge_cancel).await {
                        tracing::warn!(session_id, error = %e, "subprocess bridge exited with an error");
                    }
                });
            }
            Err(e) => tracing::warn!(session_id, error = %e, "failed to spawn subprocess bridge"),
        }
    }

    let nudges = new_nudge_queue();
    let mut inactivity_intensity: Option<NudgeIntensity> = None;
    let mut pending_nudge_ledger: VecDeque<NudgeRecord> = VecDeque::new();
    let event_writer = EventLogWriter::new(&deps.data_root);
    let transcript_writer = TranscriptWriter::new(&deps.data_root);

    let conversation = ConversationLoop::new(
        session_id.to_string(),
        deps.bus.clone(),
        deps.agent.clone(),
        deps.conversation_cfg.clone(),
        conv_cancel,
        deps.source,
        deps.sink.clone(),
        nudges.clone(),
        deps.knowledge_context.clone(),
    );
    let mut monitor =
        CodeMonitor::new(session_id.to_string(), deps.bus.clone(), deps.codemon_cfg.clone(), mon_cancel, deps.surface);
    monitor.start(&deps.question_id).await?;

    let conv_result: Arc<SyncMutex<Option<ConversationOutcome>>> = Arc::new(SyncMutex::new(None));
    {
        let slot = conv_result.clone();
        tokio::spawn(async move {
            let outcome = conversation.run().await.unwrap_or(ConversationOutcome::Failed);
            *slot.lock() = Some(outcome);
        });
    }
    let mon_result: Arc<SyncMutex<Option<CodemonOutcome>>> = Arc::new(SyncMutex::new(None));
    {
        let slot = mon_result.clone();
        tokio::spawn(async move {
            let outcome = monitor.run().await.unwrap_or(CodemonOutcome::Failed);
            *slot.lock() = Some(outcome);
        });
    }

    let mut bus_rx = deps.bus_rx;
    let mut accepted = false;
    let mut stop_requested = false;

    let mut interval = tokio::time::interval(StdDuration::from_millis(deps.runtime_cfg.poll_timeout_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let now = Utc::now();
        deps.bus.flush_ready(now).await;

        while let Ok(envelope) = bus_rx.try_recv() {
            event_writer.append(&envelope)?;
            {
                let mut s = session.lock();
                s.last_event = Some(event_label(&envelope.kind).to_string());
            }

            match &envelope.kind {
                EventKind::TurnCandidate { turn_seq, text, .. } => {
                    let turn = ConversationTurn {
                        seq: *turn_seq,
                        role: TurnRole::Candidate,
                        text: text.clone(),
                        audio_ref: None,
                        t_start: envelope.t,
                        t_end: envelope.t,
                        confidence: None,
                    };
                    transcript_writer.append(session_id, &turn)?;
                    turns_out.push(turn);

                    match lie_engine.check_utterance(*turn_seq, text, &lie_cancel).await {
                        Ok(CheckOutcome::NudgeRequired { nudge_text, intensity }) => {
                            nudges.lock().push_back(PendingNudge { text: nudge_text, kind: NudgeKind::Lie, intensity })
                        }
                        Ok(CheckOutcome::NoAction) => {}
                        Err(e) => {
                            tracing::warn!(session_id, error = %e, "lie-detection check failed, continuing without a verdict")
                        }
                    }
                }
                EventKind::TurnInterviewer { turn_seq, text, .. } => {
                    let turn = ConversationTurn {
                        seq: *turn_seq,
                        role: TurnRole::Interviewer,
                        text: text.clone(),
                        audio_ref: None,
                        t_start: envelope.t,
                        t_end: envelope.t,
                        confidence: None,
                    };
                    transcript_writer.append(session_id, &turn)?;
                    turns_out.push(turn);
                }
                EventKind::CodeChanged { question_id, .. } => {
                    code_track.sampled += 1;
                    code_track.final_question_id = Some(question_id.clone());
                }
                EventKind::TestResult { question_id, k, n, .. } => {
                    let state = if k == n {
                        TestState::PassedKOfN { k: *k, n: *n }
                    } else {
                        TestState::FailedKOfN { k: *k, n: *n }
                    };
                    code_track.final_question_id = Some(question_id.clone());
                    code_track.final_test_state = state;
                    code_track.test_state_history.push(state);
                    if *k == *n {
                        accepted = true;
                    }
                }
                EventKind::Inactivity { elapsed_ms, .. } => {
                    let next_intensity = match inactivity_intensity {
                        None => NudgeIntensity::Polite,
                        Some(i) => i.escalate(),
                    };
                    inactivity_intensity = Some(next_intensity);

                    let nudge_text = compose_inactivity_nudge_text(*elapsed_ms, next_intensity);
                    let turn_seq = turns_out.last().map(|t| t.seq).unwrap_or(0);
                    pending_nudge_ledger.push_back(NudgeRecord {
                        turn_seq,
                        kind: NudgeKind::Inactivity,
                        intensity: next_intensity,
                        prompt_text: nudge_text.clone(),
                        delivered_at: envelope.t,
                        candidate_followup: None,
                    });
                    deps.bus.publish(
                        Producer::Controller,
                        EventKind::NudgeRequired {
                            session_id: session_id.to_string(),
                            turn_seq,
                            kind: NudgeKind::Inactivity.wire_name().into(),
                            intensity: next_intensity.wire_name().into(),
                        },
                    );
                    nudges.lock().push_back(PendingNudge { text: nudge_text, kind: NudgeKind::Inactivity, intensity: next_intensity });
                }
                EventKind::NudgeDelivered { turn_seq, kind, .. } if kind != "lie" => {
                    if let Some(mut record) = pending_nudge_ledger.pop_front() {
                        record.turn_seq = *turn_seq;
                        record.delivered_at = envelope.t;
                        delivered_nudges_out.push(record);
                    }
                }
                EventKind::SystemError { message, .. } => {
                    return Err(Error::ContractViolation(message.clone()));
                }
                _ => {}
            }
        }

        if let Some(store) = &deps.store {
            if store.stop_requested(session_id) {
                stop_requested = true;
            }
        }

        if let Some(ConversationOutcome::Failed) = *conv_result.lock() {
            return Err(Error::ContractViolation("conversation loop failed: stt reconnect exhausted".into()));
        }
        if let Some(CodemonOutcome::Failed) = *mon_result.lock() {
            return Err(Error::ContractViolation("code monitor failed: editor navigation lost".into()));
        }

        let past_deadline = session.lock().is_past_deadline(now);

        // Acceptance is always drained and checked before the deadline
        // within the same tick, so a just-arrived `TEST_RESULT` wins a
        // tie against a simultaneously expiring deadline (spec.md §4.1).
        let reason = if accepted {
            Some(CompletionReason::Accepted)
        } else if session_cancel.is_cancelled() || stop_requested {
            Some(CompletionReason::OperatorStop)
        } else if past_deadline {
            Some(CompletionReason::DeadlineExpired)
        } else {
            None
        };

        let Some(reason) = reason else { continue };

        transition(session, session_id, SessionStatus::Completing)?;
        cancel_map.cancel(session_id);

        let grace = StdDuration::from_millis(deps.runtime_cfg.shutdown_grace_ms);
        let deadline_for_grace = tokio::time::Instant::now() + grace;
        while (conv_result.lock().is_none() || mon_result.lock().is_none()) && tokio::time::Instant::now() < deadline_for_grace {
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }

        deps.bus.flush_all().await;
        while let Ok(envelope) = bus_rx.try_recv() {
            event_writer.append(&envelope)?;
        }

        deps.bus.publish(
            Producer::Controller,
            EventKind::SessionEnded { session_id: session_id.to_string(), reason: format!("{reason:?}").to_lowercase() },
        );
        deps.bus.flush_all().await;
        while let Ok(envelope) = bus_rx.try_recv() {
            event_writer.append(&envelope)?;
        }

        transition(session, session_id, SessionStatus::Ended)?;
        return Ok((SessionStatus::Ended, Some(reason)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ivorch_agent::traits::{CompletionRequest, LlmProvider};
    use ivorch_codemon::{RawEditorRead, SelectorConfig};
    use ivorch_conversation::speech::{RecordingSpeechSink, ScriptedSpeechSource};
    use ivorch_domain::model::{Claim, ClaimCategory, ClaimSource, TestState};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Serializes controller tests against the process-wide `AlreadyRunning`
    /// guard, which would otherwise make them flaky under parallel test
    /// execution.
    static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn reset_guard() {
        SESSION_ACTIVE.store(false, Ordering::SeqCst);
    }

    struct NoopProvider;

    #[async_trait]
    impl LlmProvider for NoopProvider {
        async fn complete(&self, _req: &CompletionRequest) -> Result<String> {
            Ok(r#"{"response_type":"ClaimVerdict","verdict":"consistent","confidence":0.1,"supporting_claim_ids":[],"category":"experience","reasoning":"n/a"}"#.into())
        }

        fn provider_id(&self) -> &str {
            "noop"
        }
    }

    struct StaticSurface {
        reads: StdMutex<VecDeque<Result<Option<RawEditorRead>>>>,
    }

    #[async_trait]
    impl EditorSurface for StaticSurface {
        async fn navigate(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }

        async fn read(&mut self, _selectors: &SelectorConfig) -> Result<Option<RawEditorRead>> {
            match self.reads.lock().unwrap().pop_front() {
                Some(item) => item,
                None => Ok(Some(RawEditorRead {
                    editor_text: "x = 1".into(),
                    language: "python".into(),
                    submit_in_flight: false,
                    test_state: TestState::Unknown,
                })),
            }
        }
    }

    fn candidate() -> CandidateProfile {
        CandidateProfile { candidate_id: "c1".into(), display_name: "Ada".into() }
    }

    fn kb() -> Arc<KnowledgeBase> {
        Arc::new(KnowledgeBase {
            candidate_id: "c1".into(),
            claims: vec![Claim::new("k1".into(), ClaimSource::Resume, ClaimCategory::Experience, "3 years at Acme".into(), 0.8)],
        })
    }

    fn deps_with(
        reads: Vec<Result<Option<RawEditorRead>>>,
        data_root: &std::path::Path,
    ) -> SessionDeps<ScriptedSpeechSource, RecordingSpeechSink, StaticSurface> {
        let (bus, bus_rx) = EventBus::new(64);
        SessionDeps {
            bus: Arc::new(bus),
            bus_rx,
            agent: Arc::new(AgentRuntime::new(vec![Arc::new(NoopProvider)], 0)),
            conversation_cfg: ConversationConfig::default(),
            codemon_cfg: CodemonConfig::default(),
            lie_cfg: LieConfig::default(),
            runtime_cfg: RuntimeConfig { poll_timeout_ms: 20, shutdown_grace_ms: 200, ..RuntimeConfig::default() },
            data_root: data_root.to_path_buf(),
            source: ScriptedSpeechSource::new(vec![]),
            sink: Arc::new(RecordingSpeechSink::new()),
            surface: StaticSurface { reads: StdMutex::new(reads.into()) },
            question_id: "q1".into(),
            knowledge_context: render_knowledge_context(&kb()),
            store: None,
            bridge_command: None,
        }
    }

    #[tokio::test]
    async fn rejects_nonpositive_duration() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        reset_guard();
        let dir = tempfile::tempdir().unwrap();
        let err = SessionController::start(candidate(), kb(), InterviewMode::Friendly, StdDuration::from_secs(0), deps_with(vec![], dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        reset_guard();
    }

    #[tokio::test]
    async fn second_start_while_active_is_rejected() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        reset_guard();
        let dir = tempfile::tempdir().unwrap();
        let controller = SessionController::start(
            candidate(),
            kb(),
            InterviewMode::Friendly,
            StdDuration::from_secs(60),
            deps_with(vec![], dir.path()),
        )
        .await
        .unwrap();

        let err = SessionController::start(
            candidate(),
            kb(),
            InterviewMode::Friendly,
            StdDuration::from_secs(60),
            deps_with(vec![], dir.path()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning));

        controller.stop().await;
        reset_guard();
    }

    #[tokio::test]
    async fn deadline_expiry_ends_session_with_reason() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        reset_guard();
        let dir = tempfile::tempdir().unwrap();
        let controller = SessionController::start(
            candidate(),
            kb(),
            InterviewMode::Friendly,
            StdDuration::from_millis(50),
            deps_with(vec![], dir.path()),
        )
        .await
        .unwrap();

        let outcome = tokio::time::timeout(StdDuration::from_secs(5), controller.stop())
            .await
            .expect("session should terminate once its deadline passes");
        assert_eq!(outcome.status, SessionStatus::Ended);
        assert_eq!(outcome.completion_reason, Some(CompletionReason::DeadlineExpired));
        reset_guard();
    }

    #[tokio::test]
    async fn operator_stop_ends_session_with_reason() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        reset_guard();
        let dir = tempfile::tempdir().unwrap();
        let controller = SessionController::start(
            candidate(),
            kb(),
            InterviewMode::Friendly,
            StdDuration::from_secs(60),
            deps_with(vec![], dir.path()),
        )
        .await
        .unwrap();

        let outcome = controller.stop().await;
        assert_eq!(outcome.status, SessionStatus::Ended);
        assert_eq!(outcome.completion_reason, Some(CompletionReason::OperatorStop));

        // Idempotent: a second call returns the same recorded outcome.
        let again = controller.stop().await;
        assert_eq!(again.completion_reason, outcome.completion_reason);
        reset_guard();
    }

    #[tokio::test]
    async fn bridged_subprocess_output_reaches_the_event_log() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        reset_guard();
        let dir = tempfile::tempdir().unwrap();
        let mut deps = deps_with(vec![], dir.path());
        let record = serde_json::json!({
            "type": "AGENT_OUTPUT",
            "session_id": "bridged-session",
            "data": {"turn_seq": 7, "text": "a bridged interviewer question"},
        })
        .to_string();
        deps.bridge_command = Some(("printf".into(), vec!["%s\\n".into(), record]));
        let controller = SessionController::start(candidate(), kb(), InterviewMode::Friendly, StdDuration::from_secs(60), deps)
            .await
            .unwrap();

        // The bridge publishes onto the session's shared bus and its
        // record is tagged with its own `session_id` independent of the
        // controller's; confirm it lands in the log file keyed by that id.
        let log_path = dir.path().join("bridged-session.events.jsonl");
        tokio::time::timeout(StdDuration::from_secs(5), async {
            loop {
                if let Ok(contents) = std::fs::read_to_string(&log_path) {
                    if contents.contains("a bridged interviewer question") {
                        break;
                    }
                }
                tokio::time::sleep(StdDuration::from_millis(20)).await;
            }
        })
        .await
        .expect("the bridged AGENT_OUTPUT record should reach the event log");

        controller.stop().await;
        reset_guard();
    }

    #[tokio::test]
    async fn accepted_submission_ends_session_before_deadline() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        reset_guard();
        let dir = tempfile::tempdir().unwrap();
        let reads = vec![
            Ok(Some(RawEditorRead { editor_text: "x = 1".into(), language: "python".into(), submit_in_flight: false, test_state: TestState::Unknown })),
            Ok(Some(RawEditorRead {
                editor_text: "x = 1".into(),
                language: "python".into(),
                submit_in_flight: true,
                test_state: TestState::PassedKOfN { k: 2, n: 2 },
            })),
        ];
        let mut deps = deps_with(reads, dir.path());
        deps.codemon_cfg.polling_interval_ms = 10;
        let controller = SessionController::start(candidate(), kb(), InterviewMode::Friendly, StdDuration::from_secs(60), deps)
            .await
            .unwrap();

        let outcome = tokio::time::timeout(StdDuration::from_secs(5), async {
            loop {
                let status = controller.status();
                if status.status == SessionStatus::Ended {
                    break controller.stop().await;
                }
                tokio::time::sleep(StdDuration::from_millis(20)).await;
            }
        })
        .await
        .expect("session should accept the submission before the test timeout");
        assert_eq!(outcome.completion_reason, Some(CompletionReason::Accepted));
        reset_guard();
    }

    #[tokio::test]
    async fn cross_process_stop_flag_is_observed() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        reset_guard();
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SessionStore::new(dir.path()).unwrap());
        let mut deps = deps_with(vec![], dir.path());
        deps.store = Some(store.clone());
        let controller = SessionController::start(candidate(), kb(), InterviewMode::Friendly, StdDuration::from_secs(60), deps)
            .await
            .unwrap();

        store.request_stop(controller.session_id()).unwrap();

        tokio::time::timeout(StdDuration::from_secs(5), async {
            loop {
                if controller.status().status == SessionStatus::Ended {
                    break;
                }
                tokio::time::sleep(StdDuration::from_millis(20)).await;
            }
        })
        .await
        .expect("a stop flag file alone should be enough to end the session");

        let outcome = controller.stop().await;
        assert_eq!(outcome.completion_reason, Some(CompletionReason::OperatorStop));
        reset_guard();
    }
}
