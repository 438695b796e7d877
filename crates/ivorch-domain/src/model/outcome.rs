use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::code::TestState;
use super::conversation::ConversationTurn;
use super::lie::{Lie, NudgeRecord};
use super::session::CandidateProfile;

/// Hirability recommendation bands (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongHire,
    Hire,
    WeakHire,
    WeakNoHire,
    NoHire,
}

impl Recommendation {
    /// Band an overall score in [0, 100] into a recommendation.
    ///
    /// Ties at band edges round down (conservative): `overall == 80.0` is
    /// `StrongHire`, `79.999...` is `Hire`.
    pub fn from_overall(overall: f64) -> Self {
        if overall >= 80.0 {
            Recommendation::StrongHire
        } else if overall >= 65.0 {
            Recommendation::Hire
        } else if overall >= 50.0 {
            Recommendation::WeakHire
        } else if overall >= 35.0 {
            Recommendation::WeakNoHire
        } else {
            Recommendation::NoHire
        }
    }
}

/// Category sub-scores plus the weighted overall (spec.md §4.8).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Scores {
    pub technical: f64,
    pub ai_ml: f64,
    pub experience: f64,
    pub education: f64,
    pub soft: f64,
    pub overall: f64,
}

impl Scores {
    pub const WEIGHT_TECHNICAL: f64 = 0.30;
    pub const WEIGHT_AI_ML: f64 = 0.25;
    pub const WEIGHT_EXPERIENCE: f64 = 0.20;
    pub const WEIGHT_EDUCATION: f64 = 0.15;
    pub const WEIGHT_SOFT: f64 = 0.10;

    /// Build from category sub-scores, computing `overall` as the fixed
    /// weighted sum, rounded to one decimal place.
    pub fn from_categories(
        technical: f64,
        ai_ml: f64,
        experience: f64,
        education: f64,
        soft: f64,
    ) -> Self {
        let overall = technical * Self::WEIGHT_TECHNICAL
            + ai_ml * Self::WEIGHT_AI_ML
            + experience * Self::WEIGHT_EXPERIENCE
            + education * Self::WEIGHT_EDUCATION
            + soft * Self::WEIGHT_SOFT;
        Self {
            technical: round1(technical),
            ai_ml: round1(ai_ml),
            experience: round1(experience),
            education: round1(education),
            soft: round1(soft),
            overall: round1(overall),
        }
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Aggregated code-snapshot statistics carried into the Outcome document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSnapshotsSummary {
    pub sampled: usize,
    pub final_question_id: Option<String>,
    pub final_test_state: TestState,
    pub test_state_history: Vec<TestState>,
}

/// Pointers to where the raw supporting records live (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePointers {
    pub knowledge_base_digest: String,
    pub event_log_path: String,
}

/// Canonical record produced by the Log Consolidator at session end
/// (spec.md §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewOutcome {
    pub session_id: String,
    pub candidate: CandidateProfile,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub turns: Vec<ConversationTurn>,
    pub lies: Vec<Lie>,
    pub nudges: Vec<NudgeRecord>,
    pub code_snapshots_summary: CodeSnapshotsSummary,
    pub scores: Scores,
    pub recommendation: Recommendation,
    pub source_pointers: SourcePointers,
    /// Non-empty iff the session ended in `failed` (spec.md §7).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recommendation_bands_round_down_at_edges() {
        assert_eq!(Recommendation::from_overall(80.0), Recommendation::StrongHire);
        assert_eq!(Recommendation::from_overall(79.9), Recommendation::Hire);
        assert_eq!(Recommendation::from_overall(65.0), Recommendation::Hire);
        assert_eq!(Recommendation::from_overall(64.9), Recommendation::WeakHire);
        assert_eq!(Recommendation::from_overall(50.0), Recommendation::WeakHire);
        assert_eq!(Recommendation::from_overall(49.9), Recommendation::WeakNoHire);
        assert_eq!(Recommendation::from_overall(35.0), Recommendation::WeakNoHire);
        assert_eq!(Recommendation::from_overall(34.9), Recommendation::NoHire);
        assert_eq!(Recommendation::from_overall(0.0), Recommendation::NoHire);
    }

    #[test]
    fn overall_is_fixed_weighted_sum() {
        let s = Scores::from_categories(100.0, 100.0, 100.0, 100.0, 100.0);
        assert_eq!(s.overall, 100.0);

        let s = Scores::from_categories(80.0, 60.0, 70.0, 90.0, 50.0);
        // 80*.3 + 60*.25 + 70*.2 + 90*.15 + 50*.1 = 24+15+14+13.5+5 = 71.5
        assert!((s.overall - 71.5).abs() < 1e-9);
    }

    #[test]
    fn scores_round_to_one_decimal() {
        let s = Scores::from_categories(33.333, 33.333, 33.333, 33.333, 33.333);
        assert_eq!(s.technical, 33.3);
    }
}
