use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which subsystem produced an event. Fixed priority order for merge
/// (spec.md §6): `Controller` outranks `CodeMonitor`, which outranks
/// `Conversation`, which outranks `LieDetector`, which outranks `Bridge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Producer {
    Controller,
    CodeMonitor,
    Conversation,
    LieDetector,
    Bridge,
}

impl Producer {
    /// Lower sorts first; ties at the same timestamp resolve in this order.
    fn priority(self) -> u8 {
        match self {
            Producer::Controller => 0,
            Producer::CodeMonitor => 1,
            Producer::Conversation => 2,
            Producer::LieDetector => 3,
            Producer::Bridge => 4,
        }
    }
}

/// Closed set of wire event kinds (spec.md §6). Adding a new kind means
/// adding a variant here, never stringly-typed payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EventKind {
    #[serde(rename = "session_started")]
    SessionStarted { session_id: String, candidate_id: String },
    #[serde(rename = "session_ended")]
    SessionEnded { session_id: String, reason: String },
    #[serde(rename = "turn_candidate")]
    TurnCandidate { session_id: String, turn_seq: u64, text: String },
    #[serde(rename = "turn_interviewer")]
    TurnInterviewer { session_id: String, turn_seq: u64, text: String },
    #[serde(rename = "nudge_required")]
    NudgeRequired { session_id: String, turn_seq: u64, #[serde(rename = "nudge_kind")] kind: String, intensity: String },
    #[serde(rename = "nudge_delivered")]
    NudgeDelivered { session_id: String, turn_seq: u64, #[serde(rename = "nudge_kind")] kind: String, intensity: String },
    #[serde(rename = "lie_detected")]
    LieDetected { session_id: String, turn_seq: u64, confidence: f32 },
    #[serde(rename = "code_changed")]
    CodeChanged { session_id: String, question_id: String, diff: String },
    #[serde(rename = "inactivity")]
    Inactivity { session_id: String, elapsed_ms: u64 },
    #[serde(rename = "submit_detected")]
    SubmitDetected { session_id: String, question_id: String },
    #[serde(rename = "test_result")]
    TestResult { session_id: String, question_id: String, k: u32, n: u32 },
    #[serde(rename = "system_warning")]
    SystemWarning { session_id: String, message: String },
    #[serde(rename = "system_error")]
    SystemError { session_id: String, message: String },
}

impl EventKind {
    /// Coalescing-eligible kinds may be dropped under backpressure and
    /// replaced by a later event of the same kind for the same session
    /// (spec.md §6: only diffs, never submissions/inactivity/nudges/
    /// terminal events).
    pub fn is_coalescible(&self) -> bool {
        matches!(self, EventKind::CodeChanged { .. })
    }

    pub fn session_id(&self) -> &str {
        match self {
            EventKind::SessionStarted { session_id, .. }
            | EventKind::SessionEnded { session_id, .. }
            | EventKind::TurnCandidate { session_id, .. }
            | EventKind::TurnInterviewer { session_id, .. }
            | EventKind::NudgeRequired { session_id, .. }
            | EventKind::NudgeDelivered { session_id, .. }
            | EventKind::LieDetected { session_id, .. }
            | EventKind::CodeChanged { session_id, .. }
            | EventKind::Inactivity { session_id, .. }
            | EventKind::SubmitDetected { session_id, .. }
            | EventKind::TestResult { session_id, .. }
            | EventKind::SystemWarning { session_id, .. }
            | EventKind::SystemError { session_id, .. } => session_id,
        }
    }
}

/// One entry in the durable event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub t: DateTime<Utc>,
    pub producer: Producer,
    /// Monotonic per-producer sequence number, assigned at publish time.
    pub seq: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl EventEnvelope {
    /// Total order used to merge per-producer streams: by timestamp, then
    /// by producer priority, then by per-producer seq.
    pub(crate) fn sort_key(&self) -> (DateTime<Utc>, u8, u64) {
        (self.t, self.producer.priority(), self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_priority_orders_controller_first() {
        assert!(Producer::Controller.priority() < Producer::CodeMonitor.priority());
        assert!(Producer::CodeMonitor.priority() < Producer::Conversation.priority());
        assert!(Producer::Conversation.priority() < Producer::LieDetector.priority());
        assert!(Producer::LieDetector.priority() < Producer::Bridge.priority());
    }

    #[test]
    fn only_code_changed_is_coalescible() {
        assert!(EventKind::CodeChanged { session_id: "s".into(), question_id: "q".into(), diff: "d".into() }
            .is_coalescible());
        assert!(!EventKind::SubmitDetected { session_id: "s".into(), question_id: "q".into() }
            .is_coalescible());
        assert!(!EventKind::Inactivity { session_id: "s".into(), elapsed_ms: 1 }.is_coalescible());
        assert!(!EventKind::NudgeRequired {
            session_id: "s".into(),
            turn_seq: 1,
            kind: "lie".into(),
            intensity: "firm".into()
        }
        .is_coalescible());
    }

    #[test]
    fn envelope_round_trips_through_json() {
        let env = EventEnvelope {
            t: Utc::now(),
            producer: Producer::CodeMonitor,
            seq: 1,
            kind: EventKind::CodeChanged { session_id: "s1".into(), question_id: "q1".into(), diff: "d".into() },
        };
        let raw = serde_json::to_string(&env).unwrap();
        assert!(raw.contains("\"kind\":\"code_changed\""));
        let back: EventEnvelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.kind.session_id(), "s1");
    }
}
