//! Argument parsing for the `ivorch` binary (spec.md §6's closed CLI
//! surface: `run`, `status`, `stop`, `consolidate`).

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ivorch", version, about = "Interview orchestrator core")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one interview session to completion (blocks until it ends).
    Run {
        /// Candidate id, used to locate knowledge-base ingestion artifacts.
        #[arg(long)]
        candidate: String,
        #[arg(long, value_enum, default_value = "friendly")]
        mode: ModeArg,
        /// Session deadline, seconds from now.
        #[arg(long, default_value_t = 1800)]
        duration: u64,
        /// Coding-question id used to resolve the editor URL template.
        #[arg(long, default_value = "q1")]
        question: String,
    },
    /// Print the status of the currently running session, if any.
    Status,
    /// Request that the currently running session stop, and wait for its
    /// Outcome.
    Stop,
    /// Print the persisted Outcome document for a finished session.
    Consolidate {
        #[arg(long)]
        session: String,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ModeArg {
    Friendly,
    Challenging,
}

impl From<ModeArg> for ivorch_domain::model::InterviewMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Friendly => ivorch_domain::model::InterviewMode::Friendly,
            ModeArg::Challenging => ivorch_domain::model::InterviewMode::Challenging,
        }
    }
}
