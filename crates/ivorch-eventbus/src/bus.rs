//! In-memory fan-in with fixed producer-priority merge ordering and
//! backpressure coalescing (spec.md §6).

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::event::{EventEnvelope, EventKind, Producer};

/// Window over which near-simultaneous events from different producers
/// are held before being released in merge order, so a `CodeMonitor`
/// event stamped a few ms after a `Controller` event doesn't jump ahead
/// of it once both land in the same flush.
pub const REORDER_WINDOW_MS: i64 = 50;

pub struct EventBus {
    next_seq: Mutex<HashMap<(String, Producer), u64>>,
    pending: Mutex<Vec<EventEnvelope>>,
    capacity: usize,
    out: mpsc::Sender<EventEnvelope>,
}

impl EventBus {
    /// `capacity` bounds both the output channel and the in-memory
    /// reorder buffer.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<EventEnvelope>) {
        let (out, rx) = mpsc::channel(capacity);
        (
            Self {
                next_seq: Mutex::new(HashMap::new()),
                pending: Mutex::new(Vec::new()),
                capacity,
                out,
            },
            rx,
        )
    }

    /// Publish one event, assigning it the next per-(session, producer)
    /// sequence number.
    pub fn publish(&self, producer: Producer, kind: EventKind) -> EventEnvelope {
        self.publish_at(producer, kind, Utc::now())
    }

    fn publish_at(&self, producer: Producer, kind: EventKind, t: DateTime<Utc>) -> EventEnvelope {
        let session_id = kind.session_id().to_string();
        let seq = {
            let mut next = self.next_seq.lock();
            let counter = next.entry((session_id, producer)).or_insert(0);
            let seq = *counter;
            *counter += 1;
            seq
        };
        let envelope = EventEnvelope { t, producer, seq, kind };

        let mut pending = self.pending.lock();
        if pending.len() >= self.capacity {
            // Only a buffered CODE_CHANGED for the same session may be
            // dropped to make room; every other kind grows the buffer
            // rather than lose an at-least-once guarantee.
            if let Some(pos) = pending.iter().position(|e| {
                e.kind.is_coalescible() && e.kind.session_id() == envelope.kind.session_id()
            }) {
                pending.remove(pos);
            }
        }
        let idx = pending.partition_point(|e| e.sort_key() <= envelope.sort_key());
        pending.insert(idx, envelope.clone());
        envelope
    }

    /// Drain every buffered event older than the reorder window, in merge
    /// order, forwarding each to the subscriber. Returns the count
    /// drained. Callers (the Session Controller's poll loop) should call
    /// this at `runtime.poll_timeout_ms` cadence.
    pub async fn flush_ready(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - ChronoDuration::milliseconds(REORDER_WINDOW_MS);
        let ready: Vec<EventEnvelope> = {
            let mut pending = self.pending.lock();
            let split = pending.partition_point(|e| e.t <= cutoff);
            pending.drain(..split).collect()
        };
        let n = ready.len();
        for envelope in ready {
            if self.out.send(envelope).await.is_err() {
                break;
            }
        }
        n
    }

    /// Drain everything regardless of the reorder window. Called once a
    /// session reaches `completing`, so nothing is left stranded.
    pub async fn flush_all(&self) -> usize {
        self.flush_ready(Utc::now() + ChronoDuration::milliseconds(REORDER_WINDOW_MS * 2)).await
    }
}
