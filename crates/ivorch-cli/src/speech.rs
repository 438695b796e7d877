//! Terminal-driven STT/TTS adapters for `ivorch run`.
//!
//! Real speech providers are an out-of-scope external collaborator
//! (spec.md §1); this crate only needs *some* concrete
//! `SpeechSource`/`SpeechSink` pair to drive a session from a terminal.
//! Each line of stdin is treated as one final STT segment; spoken text
//! is printed to stdout. Swapping in a real streaming provider means a
//! new adapter, not a change to the Conversation Loop.

use async_trait::async_trait;
use chrono::Utc;
use ivorch_conversation::speech::{PlaybackHandle, SpeechSink, SpeechSource, SttEvent, SttSegment};
use ivorch_domain::error::Result;
use std::io::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};

pub struct StdinSpeechSource {
    lines: tokio::io::Lines<BufReader<Stdin>>,
}

impl StdinSpeechSource {
    pub fn new() -> Self {
        Self { lines: BufReader::new(tokio::io::stdin()).lines() }
    }
}

impl Default for StdinSpeechSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSource for StdinSpeechSource {
    async fn recv(&mut self) -> Result<Option<SttEvent>> {
        loop {
            let Some(line) = self.lines.next_line().await.map_err(ivorch_domain::error::Error::Io)?
            else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            let now = Utc::now();
            return Ok(Some(SttEvent::Segment(SttSegment {
                text: line,
                is_final: true,
                t_start: now,
                t_end: now,
                confidence: 1.0,
            })));
        }
    }
}

struct PrintedHandle {
    truncated: Arc<AtomicBool>,
}

#[async_trait]
impl PlaybackHandle for PrintedHandle {
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

/// Prints each utterance as `Interviewer: <text>` and resolves
/// immediately — there's no real playback duration to wait out, so
/// barge-in against this sink is always instantaneous.
pub struct StdoutSpeechSink;

#[async_trait]
impl SpeechSink for StdoutSpeechSink {
    async fn speak(&self, text: &str) -> Result<Box<dyn PlaybackHandle>> {
        println!("Interviewer: {text}");
        std::io::stdout().flush().ok();
        Ok(Box::new(PrintedHandle { truncated: Arc::new(AtomicBool::new(false)) }))
    }
}
