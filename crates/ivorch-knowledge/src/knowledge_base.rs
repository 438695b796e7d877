//! Knowledge Base: merged, deduplicated claims for one candidate
//! (spec.md §3, §4.4).

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

use ivorch_domain::error::Result;
use ivorch_domain::model::Claim;

use crate::store::discover_artifacts;

pub struct KnowledgeBase {
    pub candidate_id: String,
    pub claims: Vec<Claim>,
}

impl KnowledgeBase {
    /// Merge every ingestion artifact for `candidate_id`, newest source
    /// wins on a dedup collision (spec.md §4.4: artifacts are read oldest
    /// first, so later artifacts overwrite earlier claims with the same
    /// dedup key).
    pub fn build(data_root: &Path, candidate_id: &str) -> Result<Self> {
        let artifacts = discover_artifacts(data_root, candidate_id)?;
        let mut by_key: HashMap<(ivorch_domain::model::ClaimCategory, String), Claim> =
            HashMap::new();

        for artifact in artifacts {
            for raw in artifact.claims {
                let claim = Claim::new(
                    uuid::Uuid::new_v4().to_string(),
                    artifact.source,
                    raw.category,
                    raw.text,
                    raw.confidence,
                );
                by_key.insert(claim.dedup_key(), claim);
            }
        }

        let mut claims: Vec<Claim> = by_key.into_values().collect();
        claims.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(Self { candidate_id: candidate_id.to_owned(), claims })
    }

    /// Stable digest of the merged claim set, recorded in the Outcome
    /// document's `source_pointers` so a later audit can tell whether the
    /// knowledge base changed underneath a completed session.
    pub fn digest(&self) -> String {
        let mut ids: Vec<&str> = self.claims.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        let mut hasher = DefaultHasher::new();
        for id in ids {
            id.hash(&mut hasher);
        }
        format!("{:016x}", hasher.finish())
    }
}
