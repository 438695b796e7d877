//! Persists the canonical Outcome document (spec.md §4.8: "the Log
//! Consolidator is the only writer of the canonical outcome file").

use std::path::{Path, PathBuf};

use ivorch_domain::error::{Error, Result};
use ivorch_domain::model::InterviewOutcome;

pub struct OutcomeWriter {
    base_dir: PathBuf,
}

impl OutcomeWriter {
    pub fn new(base_dir: &Path) -> Self {
        Self { base_dir: base_dir.to_path_buf() }
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(format!("{session_id}.outcome.json"))
    }

    /// Write the Outcome document, overwriting any prior attempt for the
    /// same session (e.g. a re-run `consolidate` CLI invocation).
    pub fn write(&self, outcome: &InterviewOutcome) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.base_dir).map_err(Error::Io)?;
        let path = self.path_for(&outcome.session_id);
        let json = serde_json::to_string_pretty(outcome)?;
        std::fs::write(&path, json).map_err(Error::Io)?;
        Ok(path)
    }

    pub fn read(&self, session_id: &str) -> Result<Option<InterviewOutcome>> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ivorch_domain::model::{
        CandidateProfile, CodeSnapshotsSummary, Recommendation, Scores, SourcePointers, TestState,
    };

    fn outcome() -> InterviewOutcome {
        let now = Utc::now();
        InterviewOutcome {
            session_id: "s1".into(),
            candidate: CandidateProfile { candidate_id: "c1".into(), display_name: "Ada".into() },
            started_at: now,
            ended_at: now,
            turns: vec![],
            lies: vec![],
            nudges: vec![],
            code_snapshots_summary: CodeSnapshotsSummary {
                sampled: 0,
                final_question_id: None,
                final_test_state: TestState::Unknown,
                test_state_history: vec![],
            },
            scores: Scores::from_categories(0.0, 0.0, 0.0, 0.0, 0.0),
            recommendation: Recommendation::NoHire,
            source_pointers: SourcePointers { knowledge_base_digest: "d".into(), event_log_path: "p".into() },
            error: None,
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutcomeWriter::new(dir.path());
        writer.write(&outcome()).unwrap();

        let back = writer.read("s1").unwrap().unwrap();
        assert_eq!(back.session_id, "s1");
    }

    #[test]
    fn missing_outcome_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutcomeWriter::new(dir.path());
        assert!(writer.read("none").unwrap().is_none());
    }
}
