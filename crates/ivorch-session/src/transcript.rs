//! Append-only JSONL transcript persistence, so the Log Consolidator can
//! rebuild a session's `ConversationTurn` history without holding the
//! whole thing in memory (spec.md §4.6 inputs: "ConversationTurns").

use std::io::Write;
use std::path::{Path, PathBuf};

use ivorch_domain::error::{Error, Result};
use ivorch_domain::model::ConversationTurn;

pub struct TranscriptWriter {
    base_dir: PathBuf,
}

impl TranscriptWriter {
    pub fn new(base_dir: &Path) -> Self {
        Self { base_dir: base_dir.to_path_buf() }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(format!("{session_id}.transcript.jsonl"))
    }

    pub fn append(&self, session_id: &str, turn: &ConversationTurn) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir).map_err(Error::Io)?;
        let mut line = serde_json::to_string(turn)?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(session_id))
            .map_err(Error::Io)?;
        file.write_all(line.as_bytes()).map_err(Error::Io)
    }

    pub fn read(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut turns = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ConversationTurn>(line) {
                Ok(turn) => turns.push(turn),
                Err(e) => tracing::warn!(session_id, error = %e, "skipping malformed transcript line"),
            }
        }
        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ivorch_domain::model::TurnRole;

    fn turn(seq: u64, text: &str) -> ConversationTurn {
        let now = Utc::now();
        ConversationTurn { seq, role: TurnRole::Candidate, text: text.into(), audio_ref: None, t_start: now, t_end: now, confidence: None }
    }

    #[test]
    fn append_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(dir.path());
        writer.append("s1", &turn(0, "hello")).unwrap();
        writer.append("s1", &turn(1, "world")).unwrap();

        let turns = writer.read("s1").unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, "world");
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let writer = TranscriptWriter::new(dir.path());
        assert!(writer.read("none").unwrap().is_empty());
    }
}
