use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::normalize::normalize;

/// Editor test-run state (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestState {
    Unknown,
    Running,
    PassedKOfN { k: u32, n: u32 },
    FailedKOfN { k: u32, n: u32 },
}

impl Default for TestState {
    fn default() -> Self {
        TestState::Unknown
    }
}

impl TestState {
    /// Whether this represents an acceptable, all-tests-passing submission.
    pub fn is_full_pass(&self) -> bool {
        matches!(self, TestState::PassedKOfN { k, n } if k == n)
    }
}

/// A point-in-time read of the remote editor surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSnapshot {
    pub t: DateTime<Utc>,
    pub editor_text: String,
    pub language: String,
    pub question_id: String,
    pub test_state: TestState,
    pub submit_in_flight: bool,
}

impl CodeSnapshot {
    /// Two snapshots are "equal" iff normalized editor_text and
    /// question_id match (spec.md §3).
    pub fn content_equal(&self, other: &CodeSnapshot) -> bool {
        self.question_id == other.question_id
            && normalize(&self.editor_text) == normalize(&other.editor_text)
    }
}

/// Derived from consecutive equal snapshots (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InactivityWindow {
    pub since: DateTime<Utc>,
    pub last_equal_at: DateTime<Utc>,
    pub elapsed: chrono::Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(text: &str, qid: &str) -> CodeSnapshot {
        CodeSnapshot {
            t: Utc::now(),
            editor_text: text.into(),
            language: "python".into(),
            question_id: qid.into(),
            test_state: TestState::Unknown,
            submit_in_flight: false,
        }
    }

    #[test]
    fn content_equal_ignores_whitespace_and_case() {
        let a = snap("def  foo():\n  pass", "q1");
        let b = snap("def foo(): pass", "q1");
        assert!(a.content_equal(&b));
    }

    #[test]
    fn content_equal_requires_same_question() {
        let a = snap("same text", "q1");
        let b = snap("same text", "q2");
        assert!(!a.content_equal(&b));
    }

    #[test]
    fn content_not_equal_on_real_diff() {
        let a = snap("def foo(): pass", "q1");
        let b = snap("def foo(): return 1", "q1");
        assert!(!a.content_equal(&b));
    }

    #[test]
    fn full_pass_requires_k_equals_n() {
        assert!(TestState::PassedKOfN { k: 5, n: 5 }.is_full_pass());
        assert!(!TestState::PassedKOfN { k: 3, n: 5 }.is_full_pass());
        assert!(!TestState::FailedKOfN { k: 0, n: 5 }.is_full_pass());
        assert!(!TestState::Unknown.is_full_pass());
    }
}
