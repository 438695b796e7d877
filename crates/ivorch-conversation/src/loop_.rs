//! The Conversation Loop engine: STT segment accumulation, Agent Runtime
//! calls, barge-in, filler masking, and STT reconnect (spec.md §4.2).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex as SyncMutex;
use tokio::time::timeout;

use ivorch_agent::prompt::{PromptBuilder, PromptSection};
use ivorch_agent::response::StructuredResponse;
use ivorch_agent::traits::CompletionRequest;
use ivorch_agent::AgentRuntime;
use ivorch_domain::cancel::CancelToken;
use ivorch_domain::config::ConversationConfig;
use ivorch_domain::error::{Error, Result};
use ivorch_domain::model::{ConversationTurn, NudgeIntensity, NudgeKind, Transcript, TurnIntent, TurnRole};
use ivorch_eventbus::{EventBus, EventKind, Producer};

use crate::accumulator::UtteranceAccumulator;
use crate::filler::pick_filler;
use crate::reconnect::ReconnectPolicy;
use crate::speech::{SpeechSink, SpeechSource, SttEvent};

const MAX_HISTORY_TURNS: usize = 20;
const MAX_SECTION_CHARS: usize = 4000;
const MAX_PROMPT_CHARS: usize = 16000;
const CANNED_PROBE: &str = "Could you walk me through your approach to that in a bit more detail?";

/// A composed nudge waiting to be spoken on the candidate's next turn,
/// tagged with the behavior pattern that triggered it and its escalation
/// level so the event log can report both (spec.md §6, S2, S4).
#[derive(Debug, Clone)]
pub struct PendingNudge {
    pub text: String,
    pub kind: NudgeKind,
    pub intensity: NudgeIntensity,
}

/// Shared queue the Session Controller drains Lie-Detection Engine (and
/// inactivity) nudges into; the Conversation Loop pulls from it when
/// building its next request (spec.md §4.5 step 3: nudges "feed back
/// into the Conversation Loop").
pub type NudgeQueue = Arc<SyncMutex<VecDeque<PendingNudge>>>;

pub fn new_nudge_queue() -> NudgeQueue {
    Arc::new(SyncMutex::new(VecDeque::new()))
}

/// How the loop stopped driving itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationOutcome {
    Cancelled,
    StreamEnded,
    /// STT reconnect attempts were exhausted; the controller should move
    /// the session to `failed`.
    Failed,
}

pub struct ConversationLoop<Src, Sink> {
    session_id: String,
    bus: Arc<EventBus>,
    agent: Arc<AgentRuntime>,
    cfg: ConversationConfig,
    cancel: CancelToken,
    source: Src,
    sink: Arc<Sink>,
    nudges: NudgeQueue,
    knowledge_context: String,
    transcript: Transcript,
    /// Set once `source.recv()` has returned `Ok(None)` — a fused
    /// source may keep returning `None` forever, so once seen we stop
    /// polling it rather than busy-loop during barge-in detection.
    stream_ended: bool,
}

impl<Src, Sink> ConversationLoop<Src, Sink>
where
    Src: SpeechSource,
    Sink: SpeechSink + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: String,
        bus: Arc<EventBus>,
        agent: Arc<AgentRuntime>,
        cfg: ConversationConfig,
        cancel: CancelToken,
        source: Src,
        sink: Arc<Sink>,
        nudges: NudgeQueue,
        knowledge_context: String,
    ) -> Self {
        Self {
            session_id,
            bus,
            agent,
            cfg,
            cancel,
            source,
            sink,
            nudges,
            knowledge_context,
            transcript: Transcript::new(),
            stream_ended: false,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Drive the loop until cancelled, the stream ends, or STT reconnect
    /// is exhausted.
    pub async fn run(mut self) -> Result<ConversationOutcome> {
        let mut acc = UtteranceAccumulator::new();
        let mut reconnect_attempt: u32 = 0;
        let policy = ReconnectPolicy::new(
            self.cfg.stt_reconnect_base_ms,
            self.cfg.stt_reconnect_factor,
            self.cfg.stt_reconnect_cap_ms,
            self.cfg.stt_reconnect_max_attempts,
        );

        loop {
            if self.cancel.is_cancelled() {
                return Ok(ConversationOutcome::Cancelled);
            }
            if self.stream_ended {
                return Ok(ConversationOutcome::StreamEnded);
            }

            let event = if acc.has_final_pending() {
                match timeout(
                    Duration::from_millis(self.cfg.end_of_turn_silence_ms),
                    self.source.recv(),
                )
                .await
                {
                    Ok(res) => res,
                    Err(_elapsed) => {
                        if let Some(committed) = acc.commit() {
                            self.handle_committed(committed.text).await?;
                        }
                        continue;
                    }
                }
            } else {
                self.source.recv().await
            };

            match event {
                Ok(Some(SttEvent::Segment(seg))) => {
                    reconnect_attempt = 0;
                    acc.push(&seg);
                }
                Ok(Some(SttEvent::EndOfSpeech)) => {
                    reconnect_attempt = 0;
                    if let Some(committed) = acc.commit() {
                        self.handle_committed(committed.text).await?;
                    }
                }
                Ok(None) => return Ok(ConversationOutcome::StreamEnded),
                Err(e) => {
                    if policy.exhausted(reconnect_attempt) {
                        self.fail_with_apology().await?;
                        return Ok(ConversationOutcome::Failed);
                    }
                    let delay = policy.delay_for_attempt(reconnect_attempt);
                    tracing::warn!(
                        session_id = %self.session_id,
                        attempt = reconnect_attempt,
                        error = %e,
                        "stt disconnected, backing off before reconnect"
                    );
                    reconnect_attempt += 1;
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn fail_with_apology(&mut self) -> Result<()> {
        let seq = self.transcript.next_seq();
        let text = "I'm sorry, I'm having trouble hearing you — we'll need to reconnect.";
        let _ = self.sink.speak(text).await;
        let now = Utc::now();
        let turn = ConversationTurn {
            seq,
            role: TurnRole::System,
            text: text.to_string(),
            audio_ref: None,
            t_start: now,
            t_end: now,
            confidence: None,
        };
        self.transcript.append(turn).map_err(Error::ContractViolation)?;
        self.bus.publish(
            Producer::Conversation,
            EventKind::SystemError {
                session_id: self.session_id.clone(),
                message: "stt reconnect attempts exhausted".into(),
            },
        );
        Ok(())
    }

    async fn handle_committed(&mut self, text: String) -> Result<()> {
        let seq = self.transcript.next_seq();
        let now = Utc::now();
        let turn = ConversationTurn {
            seq,
            role: TurnRole::Candidate,
            text: text.clone(),
            audio_ref: None,
            t_start: now,
            t_end: now,
            confidence: None,
        };
        self.transcript.append(turn).map_err(Error::ContractViolation)?;
        self.bus.publish(
            Producer::Conversation,
            EventKind::TurnCandidate { session_id: self.session_id.clone(), turn_seq: seq, text: text.clone() },
        );

        let pending_nudge = self.nudges.lock().pop_front();
        if let Some(nudge) = &pending_nudge {
            self.bus.publish(
                Producer::Conversation,
                EventKind::NudgeDelivered {
                    session_id: self.session_id.clone(),
                    turn_seq: seq,
                    kind: nudge.kind.wire_name().into(),
                    intensity: nudge.intensity.wire_name().into(),
                },
            );
        }
        let req = self.build_request(&text, pending_nudge.as_ref().map(|n| n.text.as_str()));

        let agent = self.agent.clone();
        let session_id = self.session_id.clone();
        let cancel = self.cancel.clone();
        let ask_fut = async move { agent.ask::<StructuredResponse>(&session_id, &req, &cancel).await };
        tokio::pin!(ask_fut);

        let filler_budget = Duration::from_millis(self.cfg.filler_latency_threshold_ms);
        let response = tokio::select! {
            res = &mut ask_fut => res,
            _ = tokio::time::sleep(filler_budget) => {
                let filler = pick_filler(seq);
                if let Err(e) = self.sink.speak(filler).await {
                    tracing::warn!(session_id = %self.session_id, error = %e, "filler playback failed, continuing text-only");
                }
                ask_fut.await
            }
        };

        let (utterance, _intent) = match response {
            Ok(StructuredResponse::InterviewerTurn { utterance, intent, .. }) => (utterance, intent),
            Ok(_) => (CANNED_PROBE.to_string(), TurnIntent::Probe),
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "agent call exhausted, falling back to canned probe");
                self.bus.publish(
                    Producer::Conversation,
                    EventKind::SystemWarning { session_id: self.session_id.clone(), message: e.to_string() },
                );
                (CANNED_PROBE.to_string(), TurnIntent::Probe)
            }
        };

        self.speak_with_barge_in(&utterance).await
    }

    fn build_request(&self, utterance: &str, pending_nudge: Option<&str>) -> CompletionRequest {
        let mut sections = vec![
            PromptSection { name: "knowledge_context".into(), content: self.knowledge_context.clone() },
            PromptSection {
                name: "transcript".into(),
                content: render_history(&self.transcript, MAX_HISTORY_TURNS),
            },
            PromptSection { name: "candidate_utterance".into(), content: utterance.to_string() },
        ];
        if let Some(nudge) = pending_nudge {
            sections.push(PromptSection { name: "pending_nudge".into(), content: nudge.to_string() });
        }
        let builder = PromptBuilder::new(MAX_SECTION_CHARS, MAX_PROMPT_CHARS);
        let (body, _report) = builder.build(&sections);
        CompletionRequest {
            system_prompt: "You are conducting a live technical interview. Respond as JSON: \
                {\"response_type\":\"InterviewerTurn\",\"utterance\":...,\"want_followup\":bool,\"intent\":\"question\"|\"probe\"|\"nudge_ack\"|\"close\"}."
                .into(),
            user_prompt: body,
            temperature: 0.4,
            max_tokens: 400,
        }
    }

    async fn speak_with_barge_in(&mut self, utterance: &str) -> Result<()> {
        let seq = self.transcript.next_seq();
        let handle = self.sink.speak(utterance).await?;
        let mut barged_in = false;

        loop {
            tokio::select! {
                res = handle.wait() => {
                    res?;
                    break;
                }
                event = self.source.recv(), if !self.stream_ended => {
                    match event {
                        Ok(Some(SttEvent::Segment(seg))) if seg.confidence >= self.cfg.barge_in_confidence => {
                            handle.truncate();
                            barged_in = true;
                            break;
                        }
                        Ok(None) => self.stream_ended = true,
                        _ => {}
                    }
                }
            }
        }

        let now = Utc::now();
        let turn = ConversationTurn {
            seq,
            role: TurnRole::Interviewer,
            text: utterance.to_string(),
            audio_ref: None,
            t_start: now,
            t_end: now,
            confidence: None,
        };
        self.transcript.append(turn).map_err(Error::ContractViolation)?;

        let event_text =
            if barged_in { format!("{utterance} [barge-in-truncated]") } else { utterance.to_string() };
        self.bus.publish(
            Producer::Conversation,
            EventKind::TurnInterviewer { session_id: self.session_id.clone(), turn_seq: seq, text: event_text },
        );
        if barged_in {
            tracing::info!(session_id = %self.session_id, turn_seq = seq, "barge-in truncated interviewer turn");
        }
        Ok(())
    }
}

fn render_history(transcript: &Transcript, max_turns: usize) -> String {
    transcript
        .turns()
        .iter()
        .rev()
        .take(max_turns)
        .rev()
        .map(|t| format!("{:?}: {}", t.role, t.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::{DelayedSpeechSink, RecordingSpeechSink, ScriptedSpeechSource, SttEvent, SttSegment};
    use ivorch_agent::traits::LlmProvider;
    use ivorch_domain::config::ConversationConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedProvider {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(&self, _req: &CompletionRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"{"response_type":"InterviewerTurn","utterance":"Tell me more.","want_followup":true,"intent":"question"}"#.into())
        }
        fn provider_id(&self) -> &str {
            "canned"
        }
    }

    fn seg(text: &str, is_final: bool, confidence: f32) -> SttEvent {
        let now = Utc::now();
        SttEvent::Segment(SttSegment { text: text.into(), is_final, t_start: now, t_end: now, confidence })
    }

    #[tokio::test]
    async fn commits_on_end_of_speech_and_drives_one_reply() {
        let (bus, mut rx) = EventBus::new(32);
        let bus = Arc::new(bus);
        let provider = Arc::new(CannedProvider { calls: AtomicUsize::new(0) });
        let agent = Arc::new(AgentRuntime::new(vec![provider.clone()], 1));
        let source = ScriptedSpeechSource::new(vec![
            Ok(Some(seg("I used Rust", true, 0.3))),
            Ok(Some(SttEvent::EndOfSpeech)),
            Ok(None),
        ]);
        let sink = Arc::new(RecordingSpeechSink::new());
        let cfg = ConversationConfig {
            end_of_turn_silence_ms: 50,
            filler_latency_threshold_ms: 5000,
            barge_in_confidence: 0.6,
            stt_reconnect_base_ms: 10,
            stt_reconnect_factor: 2.0,
            stt_reconnect_cap_ms: 100,
            stt_reconnect_max_attempts: 2,
        };
        let loop_ = ConversationLoop::new(
            "s1".into(),
            bus.clone(),
            agent,
            cfg,
            CancelToken::new(),
            source,
            sink.clone(),
            new_nudge_queue(),
            "no prior claims".into(),
        );

        let outcome = loop_.run().await.unwrap();
        assert_eq!(outcome, ConversationOutcome::StreamEnded);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*sink.spoken.lock().await, vec!["Tell me more.".to_string()]);

        bus.flush_all().await;
        drop(bus);
        let mut saw_candidate = false;
        while let Some(env) = rx.recv().await {
            if matches!(env.kind, EventKind::TurnCandidate { .. }) {
                saw_candidate = true;
            }
        }
        assert!(saw_candidate);
    }

    #[tokio::test]
    async fn high_confidence_segment_truncates_playback() {
        let (bus, _rx) = EventBus::new(32);
        let bus = Arc::new(bus);
        let provider = Arc::new(CannedProvider { calls: AtomicUsize::new(0) });
        let agent = Arc::new(AgentRuntime::new(vec![provider], 1));
        // First exchange commits and triggers a long-playing reply; a
        // high-confidence segment arrives while it's still "speaking".
        let source = ScriptedSpeechSource::new(vec![
            Ok(Some(seg("tell me about yourself", true, 0.3))),
            Ok(Some(SttEvent::EndOfSpeech)),
            Ok(Some(seg("wait, actually", false, 0.95))),
            Ok(None),
        ]);
        let sink = Arc::new(DelayedSpeechSink::new(Duration::from_secs(5)));
        let cfg = ConversationConfig {
            end_of_turn_silence_ms: 50,
            filler_latency_threshold_ms: 5000,
            barge_in_confidence: 0.6,
            stt_reconnect_base_ms: 10,
            stt_reconnect_factor: 2.0,
            stt_reconnect_cap_ms: 100,
            stt_reconnect_max_attempts: 2,
        };
        let loop_ = ConversationLoop::new(
            "s1".into(),
            bus,
            agent,
            cfg,
            CancelToken::new(),
            source,
            sink,
            new_nudge_queue(),
            String::new(),
        );

        let outcome = tokio::time::timeout(Duration::from_secs(2), loop_.run())
            .await
            .expect("loop should finish quickly once barge-in truncates playback")
            .unwrap();
        assert_eq!(outcome, ConversationOutcome::StreamEnded);
    }

    struct SchemaDriftProvider {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl LlmProvider for SchemaDriftProvider {
        async fn complete(&self, _req: &CompletionRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("{\"response_type\":\"InterviewerTurn\"}".into())
        }
        fn provider_id(&self) -> &str {
            "drifting"
        }
    }

    #[tokio::test]
    async fn llm_invalid_falls_back_to_canned_probe_and_warns() {
        let (bus, mut rx) = EventBus::new(32);
        let bus = Arc::new(bus);
        let provider = Arc::new(SchemaDriftProvider { calls: AtomicUsize::new(0) });
        let agent = Arc::new(AgentRuntime::new(vec![provider.clone()], 1));
        let source = ScriptedSpeechSource::new(vec![
            Ok(Some(seg("I used Rust", true, 0.3))),
            Ok(Some(SttEvent::EndOfSpeech)),
            Ok(None),
        ]);
        let sink = Arc::new(RecordingSpeechSink::new());
        let cfg = ConversationConfig {
            end_of_turn_silence_ms: 50,
            filler_latency_threshold_ms: 5000,
            barge_in_confidence: 0.6,
            stt_reconnect_base_ms: 10,
            stt_reconnect_factor: 2.0,
            stt_reconnect_cap_ms: 100,
            stt_reconnect_max_attempts: 2,
        };
        let loop_ = ConversationLoop::new(
            "s1".into(),
            bus.clone(),
            agent,
            cfg,
            CancelToken::new(),
            source,
            sink.clone(),
            new_nudge_queue(),
            String::new(),
        );

        let outcome = loop_.run().await.unwrap();
        assert_eq!(outcome, ConversationOutcome::StreamEnded);
        // Two retries on the one provider (schema never recovers), then the fallback speaks.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(*sink.spoken.lock().await, vec![CANNED_PROBE.to_string()]);

        bus.flush_all().await;
        drop(bus);
        let mut saw_warning = false;
        while let Some(env) = rx.recv().await {
            if matches!(env.kind, EventKind::SystemWarning { .. }) {
                saw_warning = true;
            }
        }
        assert!(saw_warning, "an exhausted agent call must record a SystemWarning");
    }
}
