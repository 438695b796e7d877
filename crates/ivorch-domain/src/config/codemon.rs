use serde::{Deserialize, Serialize};

/// Code Monitor polling and editor-surface configuration (spec.md §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodemonConfig {
    #[serde(default = "d_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// No-change duration before an inactivity nudge is armed, in ms.
    #[serde(default = "d_inactivity_threshold_ms")]
    pub inactivity_threshold_ms: u64,
    /// `{candidate_id}` / `{session_id}` template resolved per session.
    #[serde(default = "d_editor_url_template")]
    pub editor_url_template: String,
    #[serde(default = "d_editor_text_selector")]
    pub editor_text_selector: String,
    #[serde(default = "d_submit_button_selector")]
    pub submit_button_selector: String,
    /// Consecutive selector misses before the surface is marked stale.
    #[serde(default = "d_selector_miss_limit")]
    pub selector_miss_limit: u32,
}

impl Default for CodemonConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: d_polling_interval_ms(),
            inactivity_threshold_ms: d_inactivity_threshold_ms(),
            editor_url_template: d_editor_url_template(),
            editor_text_selector: d_editor_text_selector(),
            submit_button_selector: d_submit_button_selector(),
            selector_miss_limit: d_selector_miss_limit(),
        }
    }
}

fn d_polling_interval_ms() -> u64 {
    1000
}
fn d_inactivity_threshold_ms() -> u64 {
    120_000
}
fn d_editor_url_template() -> String {
    "http://localhost:8080/editor/{session_id}".into()
}
fn d_editor_text_selector() -> String {
    "#editor-content".into()
}
fn d_submit_button_selector() -> String {
    "#submit-button".into()
}
fn d_selector_miss_limit() -> u32 {
    3
}
