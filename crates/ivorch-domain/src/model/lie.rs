use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::knowledge::ClaimCategory;

/// Outcome of checking one candidate utterance against the Knowledge Base
/// (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Consistent,
    Unverifiable,
    Contradicted,
}

/// Output of the Lie-Detection Engine per committed candidate turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimAnalysis {
    pub turn_seq: u64,
    pub utterance: String,
    pub verdict: Verdict,
    pub confidence: f32,
    pub supporting_claim_ids: Vec<String>,
    pub category: ClaimCategory,
    pub reasoning: String,
}

impl ClaimAnalysis {
    /// Whether this analysis promotes the utterance to a Lie, given the
    /// configured threshold.
    pub fn is_lie(&self, lie_threshold: f32) -> bool {
        self.verdict == Verdict::Contradicted && self.confidence >= lie_threshold
    }
}

/// Which behavior pattern triggered a nudge (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeKind {
    Inactivity,
    Lie,
    Progress,
}

impl NudgeKind {
    /// The wire tag used in event-log payloads and `NudgeRecord` (spec.md
    /// §6); matches the `#[serde(rename_all = "snake_case")]` derive.
    pub fn wire_name(self) -> &'static str {
        match self {
            NudgeKind::Inactivity => "inactivity",
            NudgeKind::Lie => "lie",
            NudgeKind::Progress => "progress",
        }
    }
}

/// Escalation level. Ordered: `Polite < Firm < Aggressive < FinalWarning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NudgeIntensity {
    Polite,
    Firm,
    Aggressive,
    FinalWarning,
}

impl NudgeIntensity {
    /// Escalate by one step, capped at `FinalWarning`.
    pub fn escalate(self) -> Self {
        match self {
            NudgeIntensity::Polite => NudgeIntensity::Firm,
            NudgeIntensity::Firm => NudgeIntensity::Aggressive,
            NudgeIntensity::Aggressive | NudgeIntensity::FinalWarning => {
                NudgeIntensity::FinalWarning
            }
        }
    }

    /// The wire tag used in event-log payloads (spec.md §6).
    pub fn wire_name(self) -> &'static str {
        match self {
            NudgeIntensity::Polite => "polite",
            NudgeIntensity::Firm => "firm",
            NudgeIntensity::Aggressive => "aggressive",
            NudgeIntensity::FinalWarning => "final_warning",
        }
    }
}

/// A single interviewer nudge delivered to the candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeRecord {
    pub turn_seq: u64,
    pub kind: NudgeKind,
    pub intensity: NudgeIntensity,
    pub prompt_text: String,
    pub delivered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_followup: Option<String>,
}

/// A contradicted claim promoted above the confidence threshold, with its
/// strongest nudge and any elaboration (spec.md §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lie {
    pub turn_seq: u64,
    pub utterance: String,
    pub category: ClaimCategory,
    pub confidence: f32,
    pub nudge: NudgeRecord,
    /// Defaults to `"(no elaboration provided)"` if the session ends
    /// before the candidate's next turn (spec.md §4.5, S3).
    pub candidate_followup: String,
}

pub const NO_ELABORATION: &str = "(no elaboration provided)";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lie_promotion_requires_both_verdict_and_threshold() {
        let base = ClaimAnalysis {
            turn_seq: 1,
            utterance: "x".into(),
            verdict: Verdict::Contradicted,
            confidence: 0.8,
            supporting_claim_ids: vec![],
            category: ClaimCategory::Experience,
            reasoning: "r".into(),
        };
        assert!(base.is_lie(0.7));
        assert!(!base.is_lie(0.9));

        let unverifiable = ClaimAnalysis { verdict: Verdict::Unverifiable, confidence: 1.0, ..base };
        assert!(!unverifiable.is_lie(0.0));
    }

    #[test]
    fn intensity_escalates_monotonically_and_caps() {
        let mut i = NudgeIntensity::Polite;
        i = i.escalate();
        assert_eq!(i, NudgeIntensity::Firm);
        i = i.escalate();
        assert_eq!(i, NudgeIntensity::Aggressive);
        i = i.escalate();
        assert_eq!(i, NudgeIntensity::FinalWarning);
        i = i.escalate();
        assert_eq!(i, NudgeIntensity::FinalWarning);
    }

    #[test]
    fn intensity_ordering() {
        assert!(NudgeIntensity::Polite < NudgeIntensity::Firm);
        assert!(NudgeIntensity::Firm < NudgeIntensity::Aggressive);
        assert!(NudgeIntensity::Aggressive < NudgeIntensity::FinalWarning);
    }
}
