//! `ivorch stop` — cross-process request to end the running session
//! (spec.md §4.1's `stop` operation, idempotent per property #3 in
//! spec.md §8).

use std::path::PathBuf;
use std::time::Duration;

use ivorch_domain::model::SessionStatus;
use ivorch_session::{OutcomeWriter, SessionStore};

pub async fn stop(config: &ivorch_domain::config::Config) -> anyhow::Result<()> {
    let data_root = PathBuf::from(&config.data.data_root);
    let store = SessionStore::new(&data_root)?;

    let Some(session_id) = store.active_session_id()? else {
        println!("no active session");
        return Ok(());
    };

    store.request_stop(&session_id)?;
    println!("stop requested for session {session_id}, waiting...");

    let grace = Duration::from_millis(config.runtime.shutdown_grace_ms * 4);
    let deadline = tokio::time::Instant::now() + grace;
    loop {
        let session = store
            .load(&session_id)?
            .ok_or_else(|| anyhow::anyhow!("session record for {session_id} disappeared"))?;
        if matches!(session.status, SessionStatus::Ended | SessionStatus::Failed) {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("session {session_id} did not stop within the shutdown grace window");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    match OutcomeWriter::new(&data_root).read(&session_id)? {
        Some(outcome) => {
            println!("session {session_id} ended: recommendation={:?}, overall={:.1}", outcome.recommendation, outcome.scores.overall);
        }
        None => println!("session {session_id} ended, but no outcome document was found"),
    }
    Ok(())
}
