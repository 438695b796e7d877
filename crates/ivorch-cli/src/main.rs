mod bootstrap;
mod cli;
mod consolidate_cmd;
mod run;
mod speech;
mod status;
mod stop;

use clap::Parser;
use ivorch_domain::model::SessionStatus;

use crate::cli::{Cli, Command};

/// Exit codes fixed by spec.md §6: 0 success, 1 user error, 2 internal
/// error.
const EXIT_OK: i32 = 0;
const EXIT_USER_ERROR: i32 = 1;
const EXIT_INTERNAL_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap already printed usage/help to the right stream.
            e.print().ok();
            std::process::exit(EXIT_USER_ERROR);
        }
    };

    std::process::exit(dispatch(cli).await);
}

async fn dispatch(cli: Cli) -> i32 {
    let config = match bootstrap::load_and_validate_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e:#}");
            return EXIT_USER_ERROR;
        }
    };
    bootstrap::init_tracing(&config);

    match cli.command {
        Command::Run { candidate, mode, duration, question } => {
            match run::run(config, candidate, mode.into(), duration, question).await {
                Ok(outcome) => {
                    println!("session {} ended: {:?}", outcome.session_id, outcome.status);
                    if let Some(err) = &outcome.error {
                        eprintln!("error: {err}");
                    }
                    match outcome.status {
                        SessionStatus::Failed => EXIT_INTERNAL_ERROR,
                        _ => EXIT_OK,
                    }
                }
                Err(e) => classify_error(&e),
            }
        }
        Command::Status => match status::status(&config) {
            Ok(()) => EXIT_OK,
            Err(e) => classify_error(&e),
        },
        Command::Stop => match stop::stop(&config).await {
            Ok(()) => EXIT_OK,
            Err(e) => classify_error(&e),
        },
        Command::Consolidate { session } => match consolidate_cmd::consolidate(&config, &session) {
            Ok(()) => EXIT_OK,
            Err(e) => classify_error(&e),
        },
    }
}

/// Maps a top-level failure onto spec.md §6's exit codes: errors the
/// operator caused (bad input, a session already running) are user
/// error; everything else (I/O, provider, contract violations) is
/// internal.
fn classify_error(e: &anyhow::Error) -> i32 {
    eprintln!("error: {e:#}");
    let user_error = e
        .downcast_ref::<ivorch_domain::error::Error>()
        .is_some_and(|err| matches!(err, ivorch_domain::error::Error::InvalidInput(_) | ivorch_domain::error::Error::AlreadyRunning));
    if user_error {
        EXIT_USER_ERROR
    } else {
        EXIT_INTERNAL_ERROR
    }
}
