//! Error types for TeleDB.
//!
//! User-facing renderings of these errors are intentionally generic:
//! an unauthorized caller must not learn which tier an action required,
//! and storage faults must never leak internals into the chat.

use thiserror::Error;

/// Core error type for TeleDB operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Input failed validation (malformed phone number, bad password
    /// change request).
    #[error("validation failed")]
    Validation(String),

    /// Caller lacks the required tier. Rendered to users as a generic
    /// denial without naming the tier.
    #[error("not authorized")]
    Unauthorized,

    /// Caller exceeded the lookup rate limit.
    #[error("rate limit exceeded")]
    RateLimited,

    /// Storage operation failed (connectivity or query error).
    #[error("storage error")]
    Storage(String),

    /// Configuration is missing or malformed.
    #[error("configuration error")]
    Config(String),

    /// Outbound chat operation failed.
    #[error("chat transport error")]
    Chat(String),
}

/// Result type alias using TeleDB's Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
