use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the interviewer's turn is trying to accomplish (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnIntent {
    Question,
    Probe,
    NudgeAck,
    Close,
}

/// Who produced a turn (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    Interviewer,
    Candidate,
    System,
    Nudge,
}

/// A single committed utterance in the conversation log.
///
/// `seq` is strictly monotonic within a session; a `Candidate` turn may
/// only follow a non-`Candidate` turn (enforced by the owning Conversation
/// Loop, not by this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub seq: u64,
    pub role: TurnRole,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<String>,
    pub t_start: DateTime<Utc>,
    pub t_end: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl ConversationTurn {
    /// Validate the role-alternation invariant against the prior turn's role.
    pub fn is_legal_successor(prior_role: Option<TurnRole>, next_role: TurnRole) -> bool {
        if next_role != TurnRole::Candidate {
            return true;
        }
        !matches!(prior_role, Some(TurnRole::Candidate))
    }
}

/// Append-only, seq-ordered transcript. Owned exclusively by one Session.
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    pub fn next_seq(&self) -> u64 {
        self.turns.last().map(|t| t.seq + 1).unwrap_or(0)
    }

    /// Append a turn. Returns a contract violation if `seq` is not the
    /// next expected value or the role-alternation invariant is broken.
    pub fn append(&mut self, turn: ConversationTurn) -> Result<(), String> {
        let expected = self.next_seq();
        if turn.seq != expected {
            return Err(format!("non-monotonic seq: expected {expected}, got {}", turn.seq));
        }
        let prior_role = self.turns.last().map(|t| t.role);
        if !ConversationTurn::is_legal_successor(prior_role, turn.role) {
            return Err(format!(
                "candidate turn at seq {} must follow a non-candidate turn",
                turn.seq
            ));
        }
        self.turns.push(turn);
        Ok(())
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(seq: u64, role: TurnRole) -> ConversationTurn {
        let now = Utc::now();
        ConversationTurn {
            seq,
            role,
            text: "hi".into(),
            audio_ref: None,
            t_start: now,
            t_end: now,
            confidence: None,
        }
    }

    #[test]
    fn seq_must_be_monotonic() {
        let mut t = Transcript::new();
        t.append(turn(0, TurnRole::Interviewer)).unwrap();
        let err = t.append(turn(2, TurnRole::Candidate)).unwrap_err();
        assert!(err.contains("non-monotonic"));
    }

    #[test]
    fn candidate_cannot_follow_candidate() {
        let mut t = Transcript::new();
        t.append(turn(0, TurnRole::Interviewer)).unwrap();
        t.append(turn(1, TurnRole::Candidate)).unwrap();
        let err = t.append(turn(2, TurnRole::Candidate)).unwrap_err();
        assert!(err.contains("must follow"));
    }

    #[test]
    fn candidate_may_follow_nudge_or_system() {
        let mut t = Transcript::new();
        t.append(turn(0, TurnRole::Interviewer)).unwrap();
        t.append(turn(1, TurnRole::Candidate)).unwrap();
        t.append(turn(2, TurnRole::Nudge)).unwrap();
        assert!(t.append(turn(3, TurnRole::Candidate)).is_ok());
    }

    #[test]
    fn first_turn_may_be_any_role() {
        let mut t = Transcript::new();
        assert!(t.append(turn(0, TurnRole::Candidate)).is_ok());
    }

    #[test]
    fn next_seq_tracks_appended_turns() {
        let mut t = Transcript::new();
        assert_eq!(t.next_seq(), 0);
        t.append(turn(0, TurnRole::System)).unwrap();
        assert_eq!(t.next_seq(), 1);
    }
}
