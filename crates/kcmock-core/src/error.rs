//! Fatal startup errors.

use thiserror::Error;

/// Errors that prevent the server from starting.
///
/// These are raised once during startup and are not recoverable; the
/// process reports them and exits.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The provided signing key material could not be loaded.
    #[error("invalid key material: {0}")]
    KeyMaterial(String),

    /// The listen socket could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address the server attempted to bind.
        address: String,
        /// Underlying socket error.
        source: std::io::Error,
    },
}

/// Result type for startup operations.
pub type CoreResult<T> = std::result::Result<T, ConfigurationError>;
