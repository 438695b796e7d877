//! Assembles one `InterviewOutcome` from the inputs the Session
//! Controller collects over a session's lifetime (spec.md §4.8).

use chrono::{DateTime, Utc};

use ivorch_domain::model::{
    Claim, CandidateProfile, CodeSnapshotsSummary, InterviewOutcome, Lie, NudgeRecord,
    Recommendation, SourcePointers,
};

use crate::scoring::score_claims;

/// Everything the Log Consolidator needs to assemble an Outcome. The
/// Session Controller gathers these directly from its own in-memory
/// state (the Conversation Loop's committed turns, the Lie-Detection
/// Engine's finalized `Lie`s, the Code Monitor's snapshot stream) rather
/// than replaying the durable event log — the log exists for audit and
/// the cross-process `status`/`stop` path, not as the Scorer's source
/// of truth.
pub struct ConsolidationInputs {
    pub session_id: String,
    pub candidate: CandidateProfile,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub turns: Vec<ivorch_domain::model::ConversationTurn>,
    pub lies: Vec<Lie>,
    pub code_snapshots_summary: CodeSnapshotsSummary,
    /// The merged Knowledge Base claims, including any `Jobdesc`-sourced
    /// entries used as the scorer's requirement corpus.
    pub claims: Vec<Claim>,
    pub knowledge_base_digest: String,
    pub event_log_path: String,
    /// Nudges the Session Controller delivered outside the lie-detection
    /// path (inactivity nudges; spec.md §4.3). Lie nudges are not
    /// included here — they're already carried on each `Lie.nudge`.
    pub delivered_nudges: Vec<NudgeRecord>,
    /// Non-empty iff the session ended `failed` (spec.md §7).
    pub error: Option<String>,
}

pub fn consolidate(inputs: ConsolidationInputs) -> InterviewOutcome {
    let scores = score_claims(&inputs.claims);
    let recommendation = Recommendation::from_overall(scores.overall);
    let mut nudges: Vec<NudgeRecord> = inputs.lies.iter().map(|l| l.nudge.clone()).collect();
    nudges.extend(inputs.delivered_nudges);

    InterviewOutcome {
        session_id: inputs.session_id,
        candidate: inputs.candidate,
        started_at: inputs.started_at,
        ended_at: inputs.ended_at,
        turns: inputs.turns,
        lies: inputs.lies,
        nudges,
        code_snapshots_summary: inputs.code_snapshots_summary,
        scores,
        recommendation,
        source_pointers: SourcePointers {
            knowledge_base_digest: inputs.knowledge_base_digest,
            event_log_path: inputs.event_log_path,
        },
        error: inputs.error,
    }
}
