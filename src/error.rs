// File: src/error.rs
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T, E = RhymeError> = std::result::Result<T, E>;

/// Errors surfaced by the engine. None of them are fatal to the process.
#[derive(Debug, Error)]
pub enum RhymeError {
    /// A query arrived before any index was installed.
    #[error("rhyme index is not ready; build or install one first")]
    IndexNotReady,

    /// The raw dictionary source is not a `key -> [phrase]` object.
    #[error("invalid raw dictionary: {0}")]
    InvalidDictionary(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Persist(#[from] tempfile::PersistError),

    /// The background build thread went away without delivering an index.
    #[error("index build worker disconnected before finishing")]
    WorkerDisconnected,
}
