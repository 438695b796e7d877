//! Subprocess Bridge: reads NDJSON event records from a spawned
//! subprocess's stdout and re-publishes them onto the bus (spec.md §6).
//!
//! Grounded on the MCP stdio transport's child-process/line-reader
//! pattern, simplified to one-way event ingestion (no request/response
//! correlation — the bridge is a producer, not an RPC client).

use std::process::Stdio;

use ivorch_domain::cancel::CancelToken;
use ivorch_domain::error::{Error, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

use crate::bus::EventBus;
use crate::event::{EventKind, Producer};

/// Maximum consecutive malformed lines tolerated before the bridge gives
/// up and reports the subprocess as broken.
const MAX_CONSECUTIVE_MALFORMED: usize = 50;

/// The inbound wire record a subordinate process posts over the bridge
/// (spec.md §6): `{type, session_id, data}`.
#[derive(Debug, Deserialize)]
struct BridgeRecord {
    #[serde(rename = "type")]
    type_: String,
    session_id: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// `AGENT_OUTPUT.data` — the subordinate's next interviewer utterance.
#[derive(Debug, Deserialize)]
struct AgentOutputData {
    turn_seq: u64,
    text: String,
}

/// `AGENT_ERROR.data` — a recoverable failure reported by the subordinate.
#[derive(Debug, Deserialize)]
struct AgentErrorData {
    message: String,
}

/// `AGENT_COMPLETED.data` (spec.md §6: `reason` ∈ `completed, error,
/// interrupted, timeout`).
#[derive(Debug, Deserialize)]
struct AgentCompletedData {
    reason: String,
}

/// Maps one parsed inbound record onto the bus `EventKind`s it implies.
/// `AGENT_COMPLETED` with `reason: "completed"` ends the bridge quietly —
/// it carries no event of its own, it just means the subordinate is done.
fn map_record(record: BridgeRecord) -> std::result::Result<Option<EventKind>, String> {
    match record.type_.as_str() {
        "AGENT_OUTPUT" => {
            let data: AgentOutputData = serde_json::from_value(record.data).map_err(|e| e.to_string())?;
            Ok(Some(EventKind::TurnInterviewer {
                session_id: record.session_id,
                turn_seq: data.turn_seq,
                text: data.text,
            }))
        }
        "AGENT_ERROR" => {
            let data: AgentErrorData = serde_json::from_value(record.data).map_err(|e| e.to_string())?;
            Ok(Some(EventKind::SystemWarning { session_id: record.session_id, message: data.message }))
        }
        "AGENT_COMPLETED" => {
            let data: AgentCompletedData = serde_json::from_value(record.data).map_err(|e| e.to_string())?;
            if data.reason == "completed" {
                Ok(None)
            } else {
                Ok(Some(EventKind::SystemWarning {
                    session_id: record.session_id,
                    message: format!("agent_completed:{}", data.reason),
                }))
            }
        }
        other => Err(format!("unrecognized bridge record type {other:?}")),
    }
}

pub struct SubprocessBridge {
    session_id: String,
    child: Child,
    stdout: BufReader<ChildStdout>,
}

impl SubprocessBridge {
    pub fn spawn(session_id: &str, command: &str, args: &[String]) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(Error::Io)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Protocol("failed to capture subprocess stdout".into()))?;

        Ok(Self { session_id: session_id.to_string(), child, stdout: BufReader::new(stdout) })
    }

    /// Read NDJSON lines until cancelled or the subprocess exits,
    /// publishing each well-formed record onto `bus`. A malformed line
    /// publishes one `SystemWarning { message: "protocol" }` and is
    /// otherwise dropped rather than terminating the bridge.
    pub async fn run(mut self, bus: &EventBus, cancel: CancelToken) -> Result<()> {
        let mut line = String::new();
        let mut consecutive_malformed = 0usize;

        loop {
            if cancel.is_cancelled() {
                let _ = self.child.start_kill();
                return Ok(());
            }

            line.clear();
            let n = self.stdout.read_line(&mut line).await.map_err(Error::Io)?;
            if n == 0 {
                // EOF: subprocess closed stdout.
                return Ok(());
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let parsed = serde_json::from_str::<BridgeRecord>(trimmed).map_err(|e| e.to_string());
            let is_completed = matches!(&parsed, Ok(r) if r.type_ == "AGENT_COMPLETED");
            match parsed.and_then(map_record) {
                Ok(kind) => {
                    consecutive_malformed = 0;
                    if let Some(kind) = kind {
                        bus.publish(Producer::Bridge, kind);
                    }
                    if is_completed {
                        return Ok(());
                    }
                }
                Err(e) => {
                    consecutive_malformed += 1;
                    tracing::warn!(error = %e, line = %trimmed, "dropping malformed bridge record");
                    bus.publish(
                        Producer::Bridge,
                        EventKind::SystemWarning { session_id: self.session_id.clone(), message: "protocol".into() },
                    );
                    if consecutive_malformed >= MAX_CONSECUTIVE_MALFORMED {
                        return Err(Error::Protocol(format!(
                            "subprocess emitted {MAX_CONSECUTIVE_MALFORMED} consecutive malformed records"
                        )));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_output(turn_seq: u64, text: &str) -> String {
        serde_json::json!({
            "type": "AGENT_OUTPUT",
            "session_id": "s1",
            "data": {"turn_seq": turn_seq, "text": text},
        })
        .to_string()
    }

    fn agent_completed(reason: &str) -> String {
        serde_json::json!({
            "type": "AGENT_COMPLETED",
            "session_id": "s1",
            "data": {"reason": reason},
        })
        .to_string()
    }

    #[tokio::test]
    async fn reads_ndjson_lines_from_echo_and_stops_at_eof() {
        let (bus, mut rx) = EventBus::new(16);
        let payload = agent_output(1, "Tell me about your last project");

        let bridge = SubprocessBridge::spawn("s1", "printf", &["%s\\n".into(), payload]).unwrap();
        let result = bridge.run(&bus, CancelToken::new()).await;
        assert!(result.is_ok());
        bus.flush_all().await;

        let env = rx.try_recv().expect("AGENT_OUTPUT should publish a TurnInterviewer event");
        match env.kind {
            EventKind::TurnInterviewer { turn_seq, text, .. } => {
                assert_eq!(turn_seq, 1);
                assert_eq!(text, "Tell me about your last project");
            }
            other => panic!("expected TurnInterviewer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn agent_completed_with_non_completed_reason_warns_and_stops() {
        let (bus, mut rx) = EventBus::new(16);
        let bridge = SubprocessBridge::spawn("s1", "printf", &["%s\\n".into(), agent_completed("timeout")]).unwrap();
        let result = bridge.run(&bus, CancelToken::new()).await;
        assert!(result.is_ok());
        bus.flush_all().await;

        let env = rx.try_recv().expect("a non-completed reason should warn");
        match env.kind {
            EventKind::SystemWarning { message, .. } => assert_eq!(message, "agent_completed:timeout"),
            other => panic!("expected SystemWarning, got {other:?}"),
        }
        assert!(rx.try_recv().is_err(), "the bridge stops after AGENT_COMPLETED, nothing more to read");
    }

    #[tokio::test]
    async fn malformed_line_emits_one_system_warning_and_keeps_running() {
        let (bus, mut rx) = EventBus::new(16);
        let payload = agent_output(2, "Walk me through your approach");

        let bridge = SubprocessBridge::spawn(
            "s1",
            "printf",
            &["%b".into(), format!("{{\"type\": \"???\\n{payload}\\n")],
        )
        .unwrap();
        let result = bridge.run(&bus, CancelToken::new()).await;
        assert!(result.is_ok(), "a single malformed line must not abort the bridge");
        bus.flush_all().await;

        let mut warnings = 0;
        let mut saw_output = false;
        while let Ok(env) = rx.try_recv() {
            match env.kind {
                EventKind::SystemWarning { message, .. } if message == "protocol" => warnings += 1,
                EventKind::TurnInterviewer { .. } => saw_output = true,
                _ => {}
            }
        }
        assert_eq!(warnings, 1, "exactly one SystemWarning for the one malformed line");
        assert!(saw_output, "the well-formed line after it must still publish");
    }
}
