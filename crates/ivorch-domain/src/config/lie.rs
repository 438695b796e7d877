use serde::{Deserialize, Serialize};

/// Lie-Detection & Nudge Engine thresholds (spec.md §3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LieConfig {
    /// Minimum `ClaimAnalysis::confidence` for a `Contradicted` verdict to
    /// be promoted to a `Lie`.
    #[serde(default = "d_lie_threshold")]
    pub lie_threshold: f32,
    /// Minimum Knowledge Base match score to treat a claim as relevant
    /// enough to check at all.
    #[serde(default = "d_oracle_relevance_threshold")]
    pub oracle_relevance_threshold: f64,
}

impl Default for LieConfig {
    fn default() -> Self {
        Self {
            lie_threshold: d_lie_threshold(),
            oracle_relevance_threshold: d_oracle_relevance_threshold(),
        }
    }
}

fn d_lie_threshold() -> f32 {
    0.7
}
fn d_oracle_relevance_threshold() -> f64 {
    0.35
}
