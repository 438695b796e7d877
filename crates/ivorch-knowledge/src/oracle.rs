//! Fact Oracle: checks a candidate utterance against the Knowledge Base
//! (spec.md §3, §4.4).

use ivorch_domain::model::normalize::{normalize, token_set_similarity};
use ivorch_domain::model::{Claim, ClaimCategory};

use crate::knowledge_base::KnowledgeBase;

pub struct OracleMatch {
    pub claim: Claim,
    pub score: f64,
}

pub struct OracleResult {
    pub best_match: Option<OracleMatch>,
    /// Other relevant claims in the best match's category, handed to the
    /// Agent Runtime's claim-verification call so it can judge whether
    /// the utterance actually conflicts with recorded specifics (e.g. "3
    /// years" vs. a claim recording "1 year") — a judgment token overlap
    /// alone can't make.
    pub contradictions: Vec<OracleMatch>,
}

/// Priority used to break ties when two claims score identically against
/// an utterance: more specific categories win (an Open Question resolved
/// in DESIGN.md — the spec names no fixed order).
fn category_specificity(c: ClaimCategory) -> u8 {
    match c {
        ClaimCategory::Project => 0,
        ClaimCategory::Achievement => 1,
        ClaimCategory::Experience => 2,
        ClaimCategory::Skill => 3,
        ClaimCategory::Education => 4,
        ClaimCategory::Personal => 5,
    }
}

pub struct FactOracle<'a> {
    kb: &'a KnowledgeBase,
}

impl<'a> FactOracle<'a> {
    pub fn new(kb: &'a KnowledgeBase) -> Self {
        Self { kb }
    }

    /// Score `utterance` against every claim: substring containment scores
    /// 1.0, otherwise token-set Jaccard similarity. Ties break by more
    /// specific category, then longer normalized overlap, then whichever
    /// claim's id sorts last (newest-assigned, since ids are random but
    /// `KnowledgeBase::build` processes artifacts oldest-first so a later
    /// rebuild reassigns ids to the newest content).
    pub fn check(&self, utterance: &str, relevance_threshold: f64) -> OracleResult {
        let normalized_utterance = normalize(utterance);

        let mut scored: Vec<OracleMatch> = self
            .kb
            .claims
            .iter()
            .map(|claim| {
                let score = score(&normalized_utterance, &claim.normalized_text);
                OracleMatch { claim: claim.clone(), score }
            })
            .filter(|m| m.score >= relevance_threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap()
                .then_with(|| {
                    category_specificity(a.claim.category).cmp(&category_specificity(b.claim.category))
                })
                .then_with(|| {
                    b.claim.normalized_text.len().cmp(&a.claim.normalized_text.len())
                })
                .then_with(|| b.claim.id.cmp(&a.claim.id))
        });

        let best_match = scored.first().map(|m| OracleMatch { claim: m.claim.clone(), score: m.score });

        let contradictions = match &best_match {
            Some(best) => scored
                .into_iter()
                .filter(|m| m.claim.id != best.claim.id && m.claim.category == best.claim.category)
                .collect(),
            None => Vec::new(),
        };

        OracleResult { best_match, contradictions }
    }
}

fn score(utterance: &str, claim_text: &str) -> f64 {
    if claim_text.is_empty() {
        return 0.0;
    }
    if utterance.contains(claim_text) || claim_text.contains(utterance) {
        1.0
    } else {
        token_set_similarity(utterance, claim_text)
    }
}
