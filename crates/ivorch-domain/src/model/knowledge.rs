use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::normalize::normalize;

/// Where a Claim was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSource {
    Profile,
    Resume,
    Jobdesc,
}

/// The kind of fact a Claim represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimCategory {
    Experience,
    Education,
    Skill,
    Project,
    Achievement,
    Personal,
}

/// A verified, normalized fact about the candidate (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub source: ClaimSource,
    pub category: ClaimCategory,
    pub text: String,
    pub normalized_text: String,
    pub confidence: f32,
}

impl Claim {
    /// Construct a Claim, computing `normalized_text` from `text`.
    pub fn new(
        id: String,
        source: ClaimSource,
        category: ClaimCategory,
        text: String,
        confidence: f32,
    ) -> Self {
        let normalized_text = normalize(&text);
        Self { id, source, category, text, normalized_text, confidence }
    }

    /// Dedup key: two claims are duplicates iff their normalized text
    /// matches within the same category (spec.md §4.4).
    pub fn dedup_key(&self) -> (ClaimCategory, String) {
        (self.category, self.normalized_text.clone())
    }
}

/// On-disk shape of one ingestion artifact (SPEC_FULL.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionArtifact {
    pub candidate_id: String,
    pub source: ClaimSource,
    pub generated_at: DateTime<Utc>,
    pub claims: Vec<RawClaim>,
}

/// An unnormalized claim as it appears in an ingestion artifact, before
/// `KnowledgeBase::build` assigns it an id and normalizes its text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawClaim {
    pub category: ClaimCategory,
    pub text: String,
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_key_ignores_punctuation_differences() {
        let a = Claim::new(
            "1".into(), ClaimSource::Profile, ClaimCategory::Experience,
            "Acme, Inc. -- 3 yrs".into(), 0.9,
        );
        let b = Claim::new(
            "2".into(), ClaimSource::Resume, ClaimCategory::Experience,
            "acme inc 3 yrs".into(), 0.8,
        );
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn dedup_key_differs_across_category() {
        let a = Claim::new(
            "1".into(), ClaimSource::Profile, ClaimCategory::Experience,
            "Python".into(), 0.9,
        );
        let b = Claim::new(
            "2".into(), ClaimSource::Profile, ClaimCategory::Skill,
            "Python".into(), 0.9,
        );
        assert_ne!(a.dedup_key(), b.dedup_key());
    }
}
