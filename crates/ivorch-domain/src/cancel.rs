//! Per-session-task cancellation, scoped to one running interview.
//!
//! A session owns a handful of concurrent tasks — the Conversation Loop,
//! the Code Monitor, the Lie-Detection Engine, and (when configured) the
//! Subprocess Bridge. Each gets its own `CancelToken`, registered under a
//! task key and added to the session's group, so that the controller can
//! cancel all of them in one call when the session transitions to
//! `completing` (spec.md §4.1) without having to track each task handle
//! individually.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A cancellation signal a task's run loop polls on every tick.
#[derive(Clone, Debug)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// One `CancelMap` per running session, owned by `run_session` for that
/// session's lifetime. Keys are `"{session_id}"` for the session's own
/// token and `"{session_id}:{component}"` for each task registered into
/// its group (see `controller.rs`'s `conv_key`/`mon_key`/`lie_key`/
/// `bridge_key`).
pub struct CancelMap {
    tokens: Mutex<HashMap<String, CancelToken>>,
    /// session_id → set of task keys owned by that session.
    groups: Mutex<HashMap<String, HashSet<String>>>,
}

impl Default for CancelMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelMap {
    pub fn new() -> Self {
        Self { tokens: Mutex::new(HashMap::new()), groups: Mutex::new(HashMap::new()) }
    }

    /// Create and register a new cancel token for a task.
    pub fn register(&self, task_key: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tokens.lock().insert(task_key.to_owned(), token.clone());
        token
    }

    /// Cancel a task and every task in its group (spec.md §4.1: the
    /// session's own key cascades to its conversation/codemon/lie/bridge
    /// tasks). Returns true if a token was found for `task_key` itself.
    pub fn cancel(&self, task_key: &str) -> bool {
        let found = if let Some(token) = self.tokens.lock().get(task_key) {
            token.cancel();
            true
        } else {
            false
        };

        if let Some(children) = self.groups.lock().get(task_key) {
            let tokens = self.tokens.lock();
            for child_key in children {
                if let Some(child_token) = tokens.get(child_key) {
                    child_token.cancel();
                }
            }
        }

        found
    }

    /// Drop the session's own token and its group, once `run_session`
    /// has finished tearing the session down. Individual task tokens are
    /// left in `tokens` — harmless, since the whole map is dropped with
    /// the session anyway.
    pub fn remove(&self, session_id: &str) {
        self.tokens.lock().remove(session_id);
        self.groups.lock().remove(session_id);
    }

    /// Register `task_key` as owned by `session_id`'s cancellation group.
    pub fn add_to_group(&self, session_id: &str, task_key: &str) {
        self.groups.lock().entry(session_id.to_owned()).or_default().insert(task_key.to_owned());
    }
}
