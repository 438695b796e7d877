//! Ingestion artifact discovery on disk (SPEC_FULL.md §3).
//!
//! Artifacts live at `<data_root>/<candidate_id>.<source>.<timestamp>.json`.
//! `timestamp` is a sortable `YYYYMMDDTHHMMSSZ` stamp, so lexicographic
//! filename order is chronological order — no need to parse every file's
//! `generated_at` just to sequence them.

use std::path::Path;

use ivorch_domain::error::{Error, Result};
use ivorch_domain::model::IngestionArtifact;

/// Load every ingestion artifact for `candidate_id` under `data_root`,
/// oldest first.
pub fn discover_artifacts(data_root: &Path, candidate_id: &str) -> Result<Vec<IngestionArtifact>> {
    if !data_root.exists() {
        return Ok(Vec::new());
    }

    let prefix = format!("{candidate_id}.");
    let mut paths: Vec<_> = std::fs::read_dir(data_root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".json"))
        })
        .collect();
    paths.sort();

    let mut artifacts = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = std::fs::read_to_string(&path)?;
        let artifact: IngestionArtifact = serde_json::from_str(&raw).map_err(|e| {
            Error::Protocol(format!("malformed ingestion artifact {}: {e}", path.display()))
        })?;
        artifacts.push(artifact);
    }
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ivorch_domain::model::{ClaimSource, RawClaim};

    fn write_artifact(dir: &Path, candidate: &str, source: &str, stamp: &str) {
        let artifact = IngestionArtifact {
            candidate_id: candidate.into(),
            source: ClaimSource::Resume,
            generated_at: Utc::now(),
            claims: vec![RawClaim {
                category: ivorch_domain::model::ClaimCategory::Skill,
                text: "Rust".into(),
                confidence: 0.9,
            }],
        };
        let raw = serde_json::to_string(&artifact).unwrap();
        std::fs::write(dir.join(format!("{candidate}.{source}.{stamp}.json")), raw).unwrap();
    }

    #[test]
    fn discovers_in_chronological_filename_order() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), "c1", "profile", "20260101T000000Z");
        write_artifact(dir.path(), "c1", "resume", "20260102T000000Z");
        write_artifact(dir.path(), "c2", "profile", "20260101T000000Z");

        let artifacts = discover_artifacts(dir.path(), "c1").unwrap();
        assert_eq!(artifacts.len(), 2);
    }

    #[test]
    fn missing_data_root_returns_empty() {
        let artifacts = discover_artifacts(Path::new("/nonexistent/ivorch-test"), "c1").unwrap();
        assert!(artifacts.is_empty());
    }
}
