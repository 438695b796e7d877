/// Shared error type used across all interview-orchestrator crates.
///
/// Maps onto the error taxonomy: `Io`/`Http`/`Timeout`/`Provider` are
/// transient-external, `Config` is configuration, `Protocol` is protocol,
/// `ContractViolation` is contract-violation (aborts the session).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("protocol: {0}")]
    Protocol(String),

    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("config: {0}")]
    Config(String),

    /// Session Controller: `start` called while a session is already
    /// active in this process (spec.md §4.1).
    #[error("a session is already running in this process")]
    AlreadyRunning,

    /// Session Controller: `start` called with a deadline at or before
    /// now (spec.md §4.1).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this is a transient-external failure, safe to retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Http(_) | Error::Timeout(_) | Error::Provider { .. }
        )
    }
}
