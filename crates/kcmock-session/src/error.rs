//! Session error types.

use thiserror::Error;

/// Errors that can occur during session storage operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// An entry already exists under this session ID.
    #[error("Session already exists: {0}")]
    DuplicateSession(String),

    /// The stored entry changed since it was read.
    #[error("Session was modified concurrently: {0}")]
    StaleSession(String),
}

impl SessionError {
    /// Checks if this is a concurrent modification error.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleSession(_))
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
