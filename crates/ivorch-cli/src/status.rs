//! `ivorch status` — cross-process read of the one session this data
//! root's `run` process is (or was) driving (spec.md §4.1's `status`
//! operation, issued from a separate invocation per SessionStore's
//! doc comment).

use std::path::PathBuf;

use chrono::Utc;
use ivorch_domain::config::Config;
use ivorch_session::SessionStore;

pub fn status(config: &Config) -> anyhow::Result<()> {
    let data_root = PathBuf::from(&config.data.data_root);
    let store = SessionStore::new(&data_root)?;

    let Some(session_id) = store.active_session_id()? else {
        println!("no active session");
        return Ok(());
    };
    let session = store.load(&session_id)?.ok_or_else(|| {
        anyhow::anyhow!("session record for {session_id} disappeared between list and load")
    })?;

    let now = Utc::now();
    println!("session_id: {session_id}");
    println!("status:     {:?}", session.status);
    println!("elapsed:    {}s", session.elapsed(now).num_seconds());
    println!("remaining:  {}s", session.remaining(now).num_seconds().max(0));
    println!("last_event: {}", session.last_event.as_deref().unwrap_or("-"));
    Ok(())
}
