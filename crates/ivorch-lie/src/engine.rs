//! Per-session Lie-Detection & Nudge Engine (spec.md §4.5).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use ivorch_agent::response::StructuredResponse;
use ivorch_agent::AgentRuntime;
use ivorch_domain::cancel::CancelToken;
use ivorch_domain::config::LieConfig;
use ivorch_domain::error::Result;
use ivorch_domain::model::{Lie, NudgeIntensity, NudgeKind, NudgeRecord, Verdict, NO_ELABORATION};
use ivorch_domain::trace::OrchestratorEvent;
use ivorch_eventbus::{EventBus, EventKind, Producer};
use ivorch_knowledge::{FactOracle, KnowledgeBase};

use crate::prompt::{build_verification_request, compose_nudge_text};

/// A contradiction that has been nudged but not yet resolved: either the
/// candidate elaborates on their next turn, or the session ends first.
struct OpenLie {
    turn_seq: u64,
    utterance: String,
    category: ivorch_domain::model::ClaimCategory,
    confidence: f32,
    nudge: NudgeRecord,
}

/// Result of checking one committed candidate utterance.
pub enum CheckOutcome {
    /// No new nudge this turn (may still have finalized prior open lies).
    NoAction,
    /// A new or escalated nudge was composed; the caller (the session
    /// controller) should push `nudge_text` into the Conversation Loop's
    /// nudge queue (spec.md §4.5 step 3), tagged with `NudgeKind::Lie`
    /// and this `intensity`.
    NudgeRequired { nudge_text: String, intensity: NudgeIntensity },
}

pub struct LieEngine {
    session_id: String,
    bus: Arc<EventBus>,
    agent: Arc<AgentRuntime>,
    cfg: LieConfig,
    kb: Arc<KnowledgeBase>,
    lie_intensity: Option<NudgeIntensity>,
    open_by_claim: HashMap<String, OpenLie>,
    lies: Vec<Lie>,
}

impl LieEngine {
    pub fn new(session_id: impl Into<String>, bus: Arc<EventBus>, agent: Arc<AgentRuntime>, cfg: LieConfig, kb: Arc<KnowledgeBase>) -> Self {
        Self {
            session_id: session_id.into(),
            bus,
            agent,
            cfg,
            kb,
            lie_intensity: None,
            open_by_claim: HashMap::new(),
            lies: Vec::new(),
        }
    }

    /// All Lies finalized (or still open) so far, for the Log
    /// Consolidator. Call [`Self::end_session`] first to flush open
    /// ones with a default `candidate_followup`.
    pub fn lies(&self) -> &[Lie] {
        &self.lies
    }

    /// Run the verification algorithm for one committed candidate turn
    /// (spec.md §4.5 steps 1-5).
    pub async fn check_utterance(&mut self, turn_seq: u64, utterance: &str, cancel: &CancelToken) -> Result<CheckOutcome> {
        let oracle = FactOracle::new(&self.kb);
        let oracle_result = oracle.check(utterance, self.cfg.oracle_relevance_threshold);

        let req = build_verification_request(utterance, &oracle_result);
        let analysis = match self.agent.ask::<StructuredResponse>(&self.session_id, &req, cancel).await {
            Ok(StructuredResponse::ClaimVerdict { verdict, confidence, supporting_claim_ids, category, reasoning }) => {
                ivorch_domain::model::ClaimAnalysis { turn_seq, utterance: utterance.to_string(), verdict, confidence, supporting_claim_ids, category, reasoning }
            }
            Ok(_) => {
                tracing::warn!(session_id = %self.session_id, "agent returned non-ClaimVerdict response, treating as unverifiable");
                ivorch_domain::model::ClaimAnalysis {
                    turn_seq,
                    utterance: utterance.to_string(),
                    verdict: Verdict::Unverifiable,
                    confidence: 0.0,
                    supporting_claim_ids: vec![],
                    category: ivorch_domain::model::ClaimCategory::Personal,
                    reasoning: "response shape mismatch".into(),
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "claim verification call failed, skipping this turn");
                return Ok(self.resolve_pending_followups(None, utterance));
            }
        };

        let contradicted_claim_id =
            if analysis.is_lie(self.cfg.lie_threshold) { oracle_result.best_match.as_ref().map(|m| m.claim.id.clone()) } else { None };

        let outcome = self.resolve_pending_followups(contradicted_claim_id.as_deref(), utterance);

        let Some(claim_id) = contradicted_claim_id else {
            return Ok(outcome);
        };

        let next_intensity = match self.lie_intensity {
            None => NudgeIntensity::Polite,
            Some(i) => i.escalate(),
        };
        self.lie_intensity = Some(next_intensity);

        let nudge_text = compose_nudge_text(analysis.category, next_intensity);
        let nudge = NudgeRecord {
            turn_seq,
            kind: NudgeKind::Lie,
            intensity: next_intensity,
            prompt_text: nudge_text.clone(),
            delivered_at: Utc::now(),
            candidate_followup: None,
        };

        OrchestratorEvent::NudgeEscalated {
            session_id: self.session_id.clone(),
            kind: NudgeKind::Lie.wire_name().into(),
            intensity: next_intensity.wire_name().into(),
        }
        .emit();
        OrchestratorEvent::LieDetected { session_id: self.session_id.clone(), turn_seq, confidence: analysis.confidence }.emit();

        self.bus.publish(
            Producer::LieDetector,
            EventKind::LieDetected { session_id: self.session_id.clone(), turn_seq, confidence: analysis.confidence },
        );
        self.bus.publish(
            Producer::LieDetector,
            EventKind::NudgeRequired {
                session_id: self.session_id.clone(),
                turn_seq,
                kind: NudgeKind::Lie.wire_name().into(),
                intensity: next_intensity.wire_name().into(),
            },
        );

        self.open_by_claim.insert(
            claim_id,
            OpenLie { turn_seq, utterance: analysis.utterance.clone(), category: analysis.category, confidence: analysis.confidence, nudge },
        );

        Ok(CheckOutcome::NudgeRequired { nudge_text, intensity: next_intensity })
    }

    /// Finalize every open lie whose underlying claim wasn't contradicted
    /// again this turn, using `utterance` as its `candidate_followup`.
    /// The lie still open on the claim just re-contradicted (if any) is
    /// left untouched — it collapses into the escalation the caller
    /// performs right after this returns.
    fn resolve_pending_followups(&mut self, reconfirmed_claim_id: Option<&str>, utterance: &str) -> CheckOutcome {
        let resolved: Vec<String> = self
            .open_by_claim
            .keys()
            .filter(|id| Some(id.as_str()) != reconfirmed_claim_id)
            .cloned()
            .collect();

        for claim_id in resolved {
            if let Some(open) = self.open_by_claim.remove(&claim_id) {
                self.finalize(open, utterance.to_string());
            }
        }
        CheckOutcome::NoAction
    }

    fn finalize(&mut self, open: OpenLie, candidate_followup: String) {
        self.lies.push(Lie {
            turn_seq: open.turn_seq,
            utterance: open.utterance,
            category: open.category,
            confidence: open.confidence,
            nudge: open.nudge,
            candidate_followup,
        });
    }

    /// Flush any still-open lies at session end with no elaboration
    /// captured (spec.md §4.5 edge case: no lies lost due to timing).
    pub fn end_session(&mut self) {
        let open: Vec<(String, OpenLie)> = self.open_by_claim.drain().collect();
        for (_, open) in open {
            self.finalize(open, NO_ELABORATION.to_string());
        }
    }
}
