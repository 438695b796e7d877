//! Polling loop that turns a raw [`EditorSurface`] read stream into the
//! `CODE_CHANGED` / `INACTIVITY` / `SUBMIT_DETECTED` / `TEST_RESULT` /
//! `EDITOR_STALE` events spec.md §4.3 describes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ivorch_domain::cancel::CancelToken;
use ivorch_domain::config::CodemonConfig;
use ivorch_domain::error::Result;
use ivorch_domain::model::{CodeSnapshot, TestState};
use ivorch_domain::trace::OrchestratorEvent;
use ivorch_eventbus::{EventBus, EventKind, Producer};

use crate::diff::compact_diff;
use crate::editor::{EditorSurface, RawEditorRead, SelectorConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodemonOutcome {
    Cancelled,
    /// Navigation loss that survived one reconnect attempt.
    Failed,
}

pub struct CodeMonitor<E> {
    session_id: String,
    bus: Arc<EventBus>,
    cfg: CodemonConfig,
    cancel: CancelToken,
    surface: E,
    selectors: SelectorConfig,
    question_id: String,
    editor_url: String,
    last_snapshot: Option<CodeSnapshot>,
    last_change_at: chrono::DateTime<Utc>,
    inactivity_armed: bool,
    consecutive_misses: u32,
    stale_reported: bool,
}

impl<E: EditorSurface> CodeMonitor<E> {
    pub fn new(session_id: impl Into<String>, bus: Arc<EventBus>, cfg: CodemonConfig, cancel: CancelToken, surface: E) -> Self {
        let selectors = SelectorConfig {
            editor_text_selector: cfg.editor_text_selector.clone(),
            submit_button_selector: cfg.submit_button_selector.clone(),
        };
        Self {
            session_id: session_id.into(),
            bus,
            cfg,
            cancel,
            surface,
            selectors,
            question_id: String::new(),
            editor_url: String::new(),
            last_snapshot: None,
            last_change_at: Utc::now(),
            inactivity_armed: false,
            consecutive_misses: 0,
            stale_reported: false,
        }
    }

    /// Navigate to the editor surface for `question_id` and reset
    /// per-question tracking state.
    pub async fn start(&mut self, question_id: &str) -> Result<()> {
        self.question_id = question_id.to_owned();
        self.editor_url = self
            .cfg
            .editor_url_template
            .replace("{session_id}", &self.session_id)
            .replace("{question_id}", question_id);
        self.surface.navigate(&self.editor_url).await?;
        self.last_snapshot = None;
        self.last_change_at = Utc::now();
        self.inactivity_armed = false;
        self.consecutive_misses = 0;
        self.stale_reported = false;
        Ok(())
    }

    pub fn current_snapshot(&self) -> Option<&CodeSnapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Drive the polling loop until cancelled or navigation is
    /// permanently lost.
    pub async fn run(mut self) -> Result<CodemonOutcome> {
        let mut interval = tokio::time::interval(Duration::from_millis(self.cfg.polling_interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            if self.cancel.is_cancelled() {
                return Ok(CodemonOutcome::Cancelled);
            }
            interval.tick().await;
            if self.cancel.is_cancelled() {
                return Ok(CodemonOutcome::Cancelled);
            }

            match self.poll_once().await {
                Ok(()) => {}
                Err(_) => {
                    // Navigation loss: one reconnect, then give up.
                    if self.surface.navigate(&self.editor_url).await.is_err() {
                        return Ok(CodemonOutcome::Failed);
                    }
                    if self.poll_once().await.is_err() {
                        return Ok(CodemonOutcome::Failed);
                    }
                }
            }
        }
    }

    async fn poll_once(&mut self) -> Result<()> {
        let read = self.surface.read(&self.selectors).await?;
        let Some(read) = read else {
            self.consecutive_misses += 1;
            tracing::warn!(session_id = %self.session_id, misses = self.consecutive_misses, "editor selector miss");
            if self.consecutive_misses >= self.cfg.selector_miss_limit && !self.stale_reported {
                OrchestratorEvent::EditorSelectorMiss {
                    session_id: self.session_id.clone(),
                    selector: self.cfg.editor_text_selector.clone(),
                    consecutive_misses: self.consecutive_misses,
                }
                .emit();
                self.bus.publish(
                    Producer::CodeMonitor,
                    EventKind::SystemWarning {
                        session_id: self.session_id.clone(),
                        message: "EDITOR_STALE".into(),
                    },
                );
                self.stale_reported = true;
            }
            return Ok(());
        };
        self.consecutive_misses = 0;

        let snapshot = self.build_snapshot(read);
        self.handle_snapshot(snapshot);
        Ok(())
    }

    fn build_snapshot(&self, read: RawEditorRead) -> CodeSnapshot {
        CodeSnapshot {
            t: Utc::now(),
            editor_text: read.editor_text,
            language: read.language,
            question_id: self.question_id.clone(),
            test_state: read.test_state,
            submit_in_flight: read.submit_in_flight,
        }
    }

    fn handle_snapshot(&mut self, snapshot: CodeSnapshot) {
        let changed = match &self.last_snapshot {
            Some(prev) => !prev.content_equal(&snapshot),
            None => true,
        };

        let prev_submit = self.last_snapshot.as_ref().map(|s| s.submit_in_flight).unwrap_or(false);
        let prev_test_state = self.last_snapshot.as_ref().map(|s| s.test_state);

        if changed {
            let diff = match &self.last_snapshot {
                Some(prev) => compact_diff(&prev.editor_text, &snapshot.editor_text),
                None => compact_diff("", &snapshot.editor_text),
            };
            self.bus.publish(
                Producer::CodeMonitor,
                EventKind::CodeChanged {
                    session_id: self.session_id.clone(),
                    question_id: self.question_id.clone(),
                    diff,
                },
            );
            self.last_change_at = Utc::now();
            self.inactivity_armed = false;
        } else if !self.inactivity_armed {
            let elapsed = (Utc::now() - self.last_change_at).num_milliseconds().max(0) as u64;
            if elapsed >= self.cfg.inactivity_threshold_ms {
                self.bus.publish(
                    Producer::CodeMonitor,
                    EventKind::Inactivity { session_id: self.session_id.clone(), elapsed_ms: elapsed },
                );
                self.inactivity_armed = true;
            }
        }

        if snapshot.submit_in_flight && !prev_submit {
            self.bus.publish(
                Producer::CodeMonitor,
                EventKind::SubmitDetected {
                    session_id: self.session_id.clone(),
                    question_id: self.question_id.clone(),
                },
            );
        }

        if let TestState::PassedKOfN { k, n } | TestState::FailedKOfN { k, n } = snapshot.test_state {
            if prev_test_state != Some(snapshot.test_state) {
                self.bus.publish(
                    Producer::CodeMonitor,
                    EventKind::TestResult {
                        session_id: self.session_id.clone(),
                        question_id: self.question_id.clone(),
                        k,
                        n,
                    },
                );
            }
        }

        self.last_snapshot = Some(snapshot);
    }
}
