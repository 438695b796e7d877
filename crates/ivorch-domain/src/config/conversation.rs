use serde::{Deserialize, Serialize};

/// Conversation Loop timing (spec.md §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Silence after a final STT segment before the turn commits, in ms.
    #[serde(default = "d_end_of_turn_silence_ms")]
    pub end_of_turn_silence_ms: u64,
    /// STT partial-result latency above which a filler is inserted, in ms.
    #[serde(default = "d_filler_latency_threshold_ms")]
    pub filler_latency_threshold_ms: u64,
    /// STT confidence above which candidate speech barges in over TTS.
    #[serde(default = "d_barge_in_confidence")]
    pub barge_in_confidence: f32,
    #[serde(default = "d_stt_reconnect_base_ms")]
    pub stt_reconnect_base_ms: u64,
    #[serde(default = "d_stt_reconnect_factor")]
    pub stt_reconnect_factor: f64,
    #[serde(default = "d_stt_reconnect_cap_ms")]
    pub stt_reconnect_cap_ms: u64,
    #[serde(default = "d_stt_reconnect_max_attempts")]
    pub stt_reconnect_max_attempts: u32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            end_of_turn_silence_ms: d_end_of_turn_silence_ms(),
            filler_latency_threshold_ms: d_filler_latency_threshold_ms(),
            barge_in_confidence: d_barge_in_confidence(),
            stt_reconnect_base_ms: d_stt_reconnect_base_ms(),
            stt_reconnect_factor: d_stt_reconnect_factor(),
            stt_reconnect_cap_ms: d_stt_reconnect_cap_ms(),
            stt_reconnect_max_attempts: d_stt_reconnect_max_attempts(),
        }
    }
}

fn d_end_of_turn_silence_ms() -> u64 {
    800
}
fn d_filler_latency_threshold_ms() -> u64 {
    1200
}
fn d_barge_in_confidence() -> f32 {
    0.6
}
fn d_stt_reconnect_base_ms() -> u64 {
    200
}
fn d_stt_reconnect_factor() -> f64 {
    2.0
}
fn d_stt_reconnect_cap_ms() -> u64 {
    5000
}
fn d_stt_reconnect_max_attempts() -> u32 {
    5
}
