//! Hirability scorer (spec.md §4.8): matches normalized job-description
//! tokens against normalized Claims to produce the five category
//! sub-scores `Scores::from_categories` weights into `overall`.

use ivorch_domain::model::normalize::tokenize;
use ivorch_domain::model::{Claim, ClaimCategory, ClaimSource, Scores};

/// A candidate claim is bucketed into one of five score categories.
/// `Experience`/`Education` map straight across; `Personal`/`Achievement`
/// both read as "soft"; `Skill`/`Project` split into `Technical` or
/// `AiMl` by keyword match against the claim's own text, since the
/// fixed six-way `ClaimCategory` taxonomy has no AI/ML category of its
/// own (an Open Question the source spec leaves unresolved — see
/// DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ScoreBucket {
    Technical,
    AiMl,
    Experience,
    Education,
    Soft,
}

const AI_ML_KEYWORDS: &[&str] = &[
    "machine learning",
    "deep learning",
    "neural network",
    "artificial intelligence",
    "llm",
    "large language model",
    "nlp",
    "natural language processing",
    "computer vision",
    "pytorch",
    "tensorflow",
    "transformer",
    "genai",
    "reinforcement learning",
];

fn is_ai_ml_text(normalized_text: &str) -> bool {
    AI_ML_KEYWORDS.iter().any(|kw| normalized_text.contains(kw))
}

fn bucket_of(claim: &Claim) -> ScoreBucket {
    match claim.category {
        ClaimCategory::Experience => ScoreBucket::Experience,
        ClaimCategory::Education => ScoreBucket::Education,
        ClaimCategory::Personal | ClaimCategory::Achievement => ScoreBucket::Soft,
        ClaimCategory::Skill | ClaimCategory::Project => {
            if is_ai_ml_text(&claim.normalized_text) {
                ScoreBucket::AiMl
            } else {
                ScoreBucket::Technical
            }
        }
    }
}

/// Denominators tuned so a well-represented candidate (roughly five
/// job-relevant claims in a bucket) lands at 100; thinner buckets score
/// proportionately lower rather than clipping to zero (spec.md §4.8:
/// "denominator is a category constant").
fn denominator_of(bucket: ScoreBucket) -> f64 {
    match bucket {
        ScoreBucket::Technical => 10.0,
        ScoreBucket::AiMl => 6.0,
        ScoreBucket::Experience => 8.0,
        ScoreBucket::Education => 4.0,
        ScoreBucket::Soft => 6.0,
    }
}

fn claim_matches_requirements(claim: &Claim, required_tokens: &std::collections::HashSet<String>) -> bool {
    if required_tokens.is_empty() {
        return false;
    }
    tokenize(&claim.normalized_text).iter().any(|t| required_tokens.contains(t))
}

/// Score every candidate claim against the job-description requirement
/// tokens drawn from the same claim set's `ClaimSource::Jobdesc` entries.
/// A job-relevant match scores 2, any other claim scores 1 (spec.md
/// §4.8); claims with no bucket representation contribute nothing.
pub fn score_claims(claims: &[Claim]) -> Scores {
    use std::collections::HashSet;

    let mut required_tokens: std::collections::HashMap<_, HashSet<String>> = std::collections::HashMap::new();
    let mut raw: std::collections::HashMap<ScoreBucket, f64> = std::collections::HashMap::new();

    for claim in claims.iter().filter(|c| c.source == ClaimSource::Jobdesc) {
        required_tokens.entry(bucket_of(claim)).or_default().extend(tokenize(&claim.normalized_text));
    }

    for claim in claims.iter().filter(|c| c.source != ClaimSource::Jobdesc) {
        let bucket = bucket_of(claim);
        let empty = HashSet::new();
        let tokens = required_tokens.get(&bucket).unwrap_or(&empty);
        let points = if claim_matches_requirements(claim, tokens) { 2.0 } else { 1.0 };
        *raw.entry(bucket).or_insert(0.0) += points;
    }

    let sub_score = |bucket: ScoreBucket| -> f64 {
        let r = *raw.get(&bucket).unwrap_or(&0.0);
        (100.0 * r / denominator_of(bucket)).min(100.0)
    };

    Scores::from_categories(
        sub_score(ScoreBucket::Technical),
        sub_score(ScoreBucket::AiMl),
        sub_score(ScoreBucket::Experience),
        sub_score(ScoreBucket::Education),
        sub_score(ScoreBucket::Soft),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivorch_domain::model::ClaimSource;

    fn claim(category: ClaimCategory, source: ClaimSource, text: &str) -> Claim {
        Claim::new(uuid::Uuid::new_v4().to_string(), source, category, text.into(), 0.9)
    }

    #[test]
    fn unmatched_claims_still_score_something() {
        let claims = vec![claim(ClaimCategory::Experience, ClaimSource::Resume, "3 years at Acme")];
        let scores = score_claims(&claims);
        assert!(scores.experience > 0.0);
        assert_eq!(scores.technical, 0.0);
    }

    #[test]
    fn job_relevant_match_outscores_non_required_claim() {
        let with_req = vec![
            claim(ClaimCategory::Skill, ClaimSource::Jobdesc, "rust programming"),
            claim(ClaimCategory::Skill, ClaimSource::Resume, "rust programming expert"),
        ];
        let without_req = vec![claim(ClaimCategory::Skill, ClaimSource::Resume, "rust programming expert")];
        assert!(score_claims(&with_req).technical > score_claims(&without_req).technical);
    }

    #[test]
    fn ai_ml_keyword_routes_to_ai_ml_bucket_not_technical() {
        let claims = vec![claim(ClaimCategory::Project, ClaimSource::Resume, "built a transformer-based NLP pipeline")];
        let scores = score_claims(&claims);
        assert!(scores.ai_ml > 0.0);
        assert_eq!(scores.technical, 0.0);
    }

    #[test]
    fn score_never_exceeds_one_hundred() {
        let claims: Vec<Claim> = (0..50).map(|_| claim(ClaimCategory::Education, ClaimSource::Resume, "PhD in Computer Science")).collect();
        assert_eq!(score_claims(&claims).education, 100.0);
    }
}
