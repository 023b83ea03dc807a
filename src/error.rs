//! Error types for the note overlay.

use thiserror::Error;

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Failures the engine can observe. None of them are fatal: callers log and
/// degrade the affected feature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The persistent store rejected a read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The extension storage API is not reachable from this context.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The stored settings object could not be parsed.
    #[error("Invalid settings: {0}")]
    Settings(String),

    /// A document operation threw.
    #[error("Page error: {0}")]
    Page(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Settings(err.to_string())
    }
}
