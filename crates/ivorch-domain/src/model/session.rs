use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate identity, sufficient to locate ingestion artifacts and
/// label the session. Populated by the (out-of-scope) web form / upload
/// surface; the orchestrator only consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub candidate_id: String,
    pub display_name: String,
}

/// Interviewer posture. Affects prompt tone, not control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewMode {
    Friendly,
    Challenging,
}

impl Default for InterviewMode {
    fn default() -> Self {
        InterviewMode::Friendly
    }
}

/// Session lifecycle state (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Collecting,
    Ready,
    Active,
    Completing,
    Ended,
    Failed,
}

impl SessionStatus {
    /// Whether `to` is a legal transition from `self`.
    ///
    /// `Failed` is reachable from any non-terminal state; `Ended` is only
    /// reachable from `Completing`.
    pub fn can_transition_to(self, to: SessionStatus) -> bool {
        use SessionStatus::*;
        if to == Failed {
            return !matches!(self, Ended | Failed);
        }
        matches!(
            (self, to),
            (Initializing, Collecting)
                | (Collecting, Ready)
                | (Ready, Active)
                | (Active, Completing)
                | (Completing, Ended)
        )
    }
}

/// Reason a session moved into `completing` (spec.md §4.1 tie-break note).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    DeadlineExpired,
    Accepted,
    OperatorStop,
}

/// The unit the orchestrator is built around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub candidate: CandidateProfile,
    pub mode: InterviewMode,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_reason: Option<CompletionReason>,
    /// Set when `status == Failed`; a non-empty explanation (spec.md §7).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Short label for the most recently processed Event Bus entry, so a
    /// `status` call against the persisted record (spec.md §4.1) has
    /// something to show without replaying the whole event log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event: Option<String>,
}

impl Session {
    pub fn new(
        session_id: String,
        candidate: CandidateProfile,
        mode: InterviewMode,
        started_at: DateTime<Utc>,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id,
            candidate,
            mode,
            started_at,
            deadline,
            status: SessionStatus::Initializing,
            completion_reason: None,
            error: None,
            last_event: None,
        }
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.started_at)
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.deadline.signed_duration_since(now)
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }
}
