//! `ivorch consolidate --session <id>` — prints the canonical Outcome
//! document for a finished session (spec.md §6 CLI surface, §4.8).
//!
//! The Log Consolidator itself only ever runs in-process, inside the
//! `run` that owned the session (see `ivorch_consolidator::consolidate`'s
//! doc comment); this subcommand never re-derives an Outcome, it only
//! reads the one `run` already persisted.

use std::path::PathBuf;

use ivorch_session::OutcomeWriter;

pub fn consolidate(config: &ivorch_domain::config::Config, session_id: &str) -> anyhow::Result<()> {
    let data_root = PathBuf::from(&config.data.data_root);
    let writer = OutcomeWriter::new(&data_root);

    match writer.read(session_id)? {
        Some(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        None => {
            anyhow::bail!(
                "no outcome document for session {session_id} at {}; it may still be running or never ran in this data root",
                writer.path_for(session_id).display()
            )
        }
    }
}
