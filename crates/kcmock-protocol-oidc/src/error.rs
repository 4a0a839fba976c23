//! Protocol error types.

use thiserror::Error;

/// Errors raised when a token cannot be parsed.
#[derive(Debug, Error)]
pub enum TokenParseError {
    /// The compact JWT form could not be decoded or its signature is invalid.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token decoded, but its claims cannot back a token configuration.
    #[error("unusable source token: {0}")]
    UnusableSource(String),
}

/// Error raised when signing a token fails.
#[derive(Debug, Error)]
#[error("token signing failed: {0}")]
pub struct TokenSigningError(pub String);

/// Result type for token parsing operations.
pub type TokenParseResult<T> = std::result::Result<T, TokenParseError>;
