use thiserror::Error;

/// Error taxonomy for the whole workspace.
///
/// Two conditions are deliberately NOT errors: an indicator without enough
/// history returns `None` (signal emission is silently suppressed), and an
/// invalid sell is surfaced as a `Rejection` event while processing
/// continues. No variant here is fatal to the process.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("strategy '{name}' not found. Available strategies: {}", .available.join(", "))]
    UnknownStrategy { name: String, available: Vec<String> },

    #[error("strategy id '{0}' is already loaded")]
    StrategyIdInUse(String),

    #[error("malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
