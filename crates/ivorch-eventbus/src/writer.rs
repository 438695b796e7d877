//! Append-only JSONL event logs.
//!
//! Each session gets a `<session_id>.jsonl` file under `data.data_root`.
//! Every event handed to the bus's subscriber is appended as one line.

use std::io::Write;
use std::path::{Path, PathBuf};

use ivorch_domain::error::{Error, Result};

use crate::event::EventEnvelope;

pub struct EventLogWriter {
    base_dir: PathBuf,
}

impl EventLogWriter {
    pub fn new(base_dir: &Path) -> Self {
        Self { base_dir: base_dir.to_path_buf() }
    }

    pub fn path_for(&self, session_id: &str) -> PathBuf {
        self.base_dir.join(format!("{session_id}.events.jsonl"))
    }

    /// Append one event. Malformed (non-serializable) envelopes can't
    /// occur by construction, so this only fails on I/O.
    pub fn append(&self, event: &EventEnvelope) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        let path = self.path_for(event.kind.session_id());
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut file =
            std::fs::OpenOptions::new().create(true).append(true).open(&path).map_err(Error::Io)?;
        file.write_all(line.as_bytes()).map_err(Error::Io)
    }
}
