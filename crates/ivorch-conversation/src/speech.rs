//! STT/TTS adapter traits and a reference fake pair for tests and demos
//! (SPEC_FULL.md §4: "Conversation Loop STT/TTS adapters").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ivorch_domain::error::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// One STT provider emission (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct SttSegment {
    pub text: String,
    pub is_final: bool,
    pub t_start: DateTime<Utc>,
    pub t_end: DateTime<Utc>,
    pub confidence: f32,
}

/// What the STT stream did between two calls to `recv`.
pub enum SttEvent {
    Segment(SttSegment),
    /// The provider signalled explicit end-of-speech (not a segment).
    EndOfSpeech,
}

/// A live speech-to-text stream for one session.
///
/// `recv` returning `Err` models a disconnect; the Conversation Loop
/// reconnects with backoff per spec.md §4.2's failure semantics.
#[async_trait]
pub trait SpeechSource: Send {
    async fn recv(&mut self) -> Result<Option<SttEvent>>;
}

/// A handle to in-flight TTS playback. Dropping it does not stop audio;
/// `truncate` must be called explicitly so barge-in is an observable act.
/// `&self` (not `&mut self`) throughout so a caller can hold a `wait()`
/// future and still call `truncate()` concurrently from the same task.
#[async_trait]
pub trait PlaybackHandle: Send + Sync {
    /// Stop playback immediately. Idempotent.
    fn truncate(&self);
    /// Whether playback is still ongoing.
    fn is_playing(&self) -> bool;
    /// Resolves once playback finishes naturally, or immediately if
    /// already truncated.
    async fn wait(&self) -> Result<()>;
}

/// A text-to-speech sink for one session.
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, text: &str) -> Result<Box<dyn PlaybackHandle>>;
}

/// A scripted STT source for tests/demos: yields a fixed sequence of
/// segments, optionally failing `recv` a configured number of times first
/// to exercise reconnect behavior.
pub struct ScriptedSpeechSource {
    queue: VecDeque<Result<Option<SttEvent>>>,
}

impl ScriptedSpeechSource {
    pub fn new(queue: Vec<Result<Option<SttEvent>>>) -> Self {
        Self { queue: queue.into() }
    }
}

#[async_trait]
impl SpeechSource for ScriptedSpeechSource {
    async fn recv(&mut self) -> Result<Option<SttEvent>> {
        match self.queue.pop_front() {
            Some(item) => item,
            None => Ok(None),
        }
    }
}

struct NoopHandle {
    truncated: Arc<AtomicBool>,
}

#[async_trait]
impl PlaybackHandle for NoopHandle {
    fn truncate(&self) {
        self.truncated.store(true, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        !self.truncated.load(Ordering::SeqCst)
    }

    async fn wait(&self) -> Result<()> {
        Ok(())
    }
}

/// A TTS sink that records every utterance it was asked to speak instead
/// of producing audio — the extension point documented for a real
/// streaming provider. Playback "finishes" the instant `speak` returns.
pub struct RecordingSpeechSink {
    pub spoken: Mutex<Vec<String>>,
}

impl RecordingSpeechSink {
    pub fn new() -> Self {
        Self { spoken: Mutex::new(Vec::new()) }
    }
}

impl Default for RecordingSpeechSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSink for RecordingSpeechSink {
    async fn speak(&self, text: &str) -> Result<Box<dyn PlaybackHandle>> {
        self.spoken.lock().await.push(text.to_owned());
        Ok(Box::new(NoopHandle { truncated: Arc::new(AtomicBool::new(false)) }))
    }
}

/// A handle whose `wait()` takes a fixed simulated duration unless
/// truncated first — lets tests exercise barge-in against a playback
/// that is still in flight when a high-confidence segment arrives.
struct TimedHandle {
    truncated: Arc<AtomicBool>,
    created: std::time::Instant,
    duration: Duration,
}

#[async_trait]
impl PlaybackHandle for TimedHandle {
    fn truncate(&self) {
        self.truncated.store(true, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        !self.truncated.load(Ordering::SeqCst)
    }

    /// Re-entrant: elapsed time is measured from `created`, not from when
    /// this call started, so calling `wait` again after a non-truncating
    /// interruption doesn't restart the simulated playback clock.
    async fn wait(&self) -> Result<()> {
        let step = Duration::from_millis(2);
        loop {
            if self.truncated.load(Ordering::SeqCst) || self.created.elapsed() >= self.duration {
                return Ok(());
            }
            tokio::time::sleep(step).await;
        }
    }
}

/// A TTS sink whose every utterance takes `duration` to "play" — the
/// reference adapter for exercising barge-in in tests without real audio.
pub struct DelayedSpeechSink {
    pub spoken: Mutex<Vec<String>>,
    duration: Duration,
}

impl DelayedSpeechSink {
    pub fn new(duration: Duration) -> Self {
        Self { spoken: Mutex::new(Vec::new()), duration }
    }
}

#[async_trait]
impl SpeechSink for DelayedSpeechSink {
    async fn speak(&self, text: &str) -> Result<Box<dyn PlaybackHandle>> {
        self.spoken.lock().await.push(text.to_owned());
        Ok(Box::new(TimedHandle {
            truncated: Arc::new(AtomicBool::new(false)),
            created: std::time::Instant::now(),
            duration: self.duration,
        }))
    }
}
