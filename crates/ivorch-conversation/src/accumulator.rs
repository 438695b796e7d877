//! Concatenates STT segments into one candidate utterance (spec.md §4.2).

use chrono::{DateTime, Utc};

use crate::speech::SttSegment;

/// An utterance committed to the conversation log, ready to be published
/// as a `candidate_turn` event.
#[derive(Debug, Clone)]
pub struct CommittedUtterance {
    pub text: String,
    pub t_start: DateTime<Utc>,
    pub t_end: DateTime<Utc>,
}

#[derive(Default)]
pub struct UtteranceAccumulator {
    parts: Vec<String>,
    t_start: Option<DateTime<Utc>>,
    t_end: Option<DateTime<Utc>>,
    /// Whether the most recently pushed segment was final — the loop
    /// starts the end-of-turn silence timer only once this is true.
    saw_final: bool,
}

impl UtteranceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: &SttSegment) {
        if self.t_start.is_none() {
            self.t_start = Some(segment.t_start);
        }
        self.t_end = Some(segment.t_end);
        self.parts.push(segment.text.clone());
        self.saw_final = segment.is_final;
    }

    pub fn has_final_pending(&self) -> bool {
        self.saw_final && !self.parts.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Finalize the accumulated text and reset for the next utterance.
    /// Returns `None` if nothing was ever pushed.
    pub fn commit(&mut self) -> Option<CommittedUtterance> {
        if self.parts.is_empty() {
            return None;
        }
        let text = self.parts.join(" ").trim().to_owned();
        let t_start = self.t_start.take().unwrap();
        let t_end = self.t_end.take().unwrap();
        self.parts.clear();
        self.saw_final = false;
        Some(CommittedUtterance { text, t_start, t_end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, is_final: bool) -> SttSegment {
        let now = Utc::now();
        SttSegment { text: text.into(), is_final, t_start: now, t_end: now, confidence: 0.9 }
    }

    #[test]
    fn non_final_segments_accumulate_without_arming_silence_timer() {
        let mut acc = UtteranceAccumulator::new();
        acc.push(&seg("hello", false));
        acc.push(&seg("world", false));
        assert!(!acc.has_final_pending());
        assert_eq!(acc.commit().unwrap().text, "hello world");
    }

    #[test]
    fn final_segment_arms_silence_timer() {
        let mut acc = UtteranceAccumulator::new();
        acc.push(&seg("hello", false));
        acc.push(&seg("world", true));
        assert!(acc.has_final_pending());
    }

    #[test]
    fn commit_resets_state() {
        let mut acc = UtteranceAccumulator::new();
        acc.push(&seg("hi", true));
        acc.commit().unwrap();
        assert!(acc.is_empty());
        assert!(!acc.has_final_pending());
        assert!(acc.commit().is_none());
    }
}
