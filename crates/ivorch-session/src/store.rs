//! On-disk session records, so `status`/`stop` issued from a separate
//! `ivorch-cli` invocation can see what the `run` process is doing
//! (spec.md §4.1 assumes in-process calls; the CLI is multi-process).
//!
//! Each session gets `<data_root>/sessions/<session_id>.json`, rewritten
//! on every state change, plus a `<session_id>.stop` flag file the
//! out-of-process `stop` command touches and the controller polls for.

use std::path::{Path, PathBuf};

use ivorch_domain::error::{Error, Result};
use ivorch_domain::model::Session;

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(data_root: &Path) -> Result<Self> {
        let dir = data_root.join("sessions");
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;
        Ok(Self { dir })
    }

    fn record_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    fn stop_flag_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.stop"))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(self.record_path(&session.session_id), json).map_err(Error::Io)
    }

    pub fn load(&self, session_id: &str) -> Result<Option<Session>> {
        let path = self.record_path(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path).map_err(Error::Io)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Any session record on disk whose status is neither `ended` nor
    /// `failed` — used to enforce `AlreadyRunning` (spec.md §4.1). This is
    /// a best-effort, same-machine check: it does not detect a process
    /// that crashed without updating its record to a terminal status.
    pub fn has_active(&self) -> Result<bool> {
        Ok(self.active_session_id()?.is_some())
    }

    /// The session id of the (at most one, per spec.md §2's "one session
    /// at a time per process") non-terminal session record on disk, if
    /// any — lets `ivorch-cli status`/`stop` find the running session
    /// without the operator having to pass its id.
    pub fn active_session_id(&self) -> Result<Option<String>> {
        if !self.dir.exists() {
            return Ok(None);
        }
        for entry in std::fs::read_dir(&self.dir).map_err(Error::Io)? {
            let path = entry.map_err(Error::Io)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
            let Ok(session) = serde_json::from_str::<Session>(&raw) else { continue };
            if !matches!(
                session.status,
                ivorch_domain::model::SessionStatus::Ended | ivorch_domain::model::SessionStatus::Failed
            ) {
                return Ok(Some(session.session_id));
            }
        }
        Ok(None)
    }

    /// Request that the running controller for `session_id` stop at its
    /// next poll tick.
    pub fn request_stop(&self, session_id: &str) -> Result<()> {
        std::fs::write(self.stop_flag_path(session_id), b"").map_err(Error::Io)
    }

    pub fn stop_requested(&self, session_id: &str) -> bool {
        self.stop_flag_path(session_id).exists()
    }

    pub fn clear_stop_flag(&self, session_id: &str) -> Result<()> {
        let path = self.stop_flag_path(session_id);
        if path.exists() {
            std::fs::remove_file(path).map_err(Error::Io)?;
        }
        Ok(())
    }
}
