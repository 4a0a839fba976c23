//! # kcmock-server
//!
//! HTTP server exposing the Keycloak mock endpoints.
//!
//! This crate wires the protocol engine into an Axum router:
//! - authorization endpoint with a login page and session continuity
//! - token endpoint with four grant types
//! - token introspection, JWKS and discovery documents
//! - logout with cookie invalidation
//!
//! ## Usage
//!
//! ```ignore
//! use kcmock_core::ServerConfig;
//! use kcmock_server::Server;
//!
//! let server = Server::new(ServerConfig::default())?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod handlers;
pub mod router;
pub mod state;
pub mod ui;

pub use router::create_router;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use kcmock_core::{ConfigurationError, CoreResult, ServerConfig};
use kcmock_crypto::KeyPair;

/// The mock identity provider server.
pub struct Server {
    config: ServerConfig,
    key_pair: Arc<KeyPair>,
}

impl Server {
    /// Creates a server signing with the embedded RSA key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded key material cannot be loaded.
    pub fn new(config: ServerConfig) -> CoreResult<Self> {
        let key_pair =
            KeyPair::default_rsa().map_err(|e| ConfigurationError::KeyMaterial(e.to_string()))?;
        Ok(Self {
            config,
            key_pair: Arc::new(key_pair),
        })
    }

    /// Creates a server signing with a caller-supplied key pair in PEM form.
    ///
    /// # Errors
    ///
    /// Returns an error if the key material cannot be loaded or uses an
    /// unsupported key type.
    pub fn with_key_material(
        config: ServerConfig,
        private_pem: &str,
        public_pem: &str,
    ) -> CoreResult<Self> {
        let key_pair = KeyPair::from_pem(private_pem, public_pem)
            .map_err(|e| ConfigurationError::KeyMaterial(e.to_string()))?;
        Ok(Self {
            config,
            key_pair: Arc::new(key_pair),
        })
    }

    /// Binds the listen socket without serving yet.
    ///
    /// With port 0 an ephemeral port is bound and patched into the
    /// configuration, so issued URLs carry the real port. The bound port can
    /// be read off the returned handle before serving starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub async fn bind(self) -> CoreResult<BoundServer> {
        let address = format!("0.0.0.0:{}", self.config.port);
        let listener =
            TcpListener::bind(&address)
                .await
                .map_err(|source| ConfigurationError::Bind {
                    address: address.clone(),
                    source,
                })?;

        let mut config = self.config;
        config.port = listener
            .local_addr()
            .map_err(|source| ConfigurationError::Bind { address, source })?
            .port();

        Ok(BoundServer {
            listener,
            config,
            key_pair: self.key_pair,
        })
    }

    /// Runs the server.
    ///
    /// This starts the HTTP server and blocks until it receives a shutdown
    /// signal.
    pub async fn run(self) -> anyhow::Result<()> {
        let bound = self.bind().await?;
        bound.serve().await
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Creates a test router without starting the server.
    ///
    /// This is useful for integration testing.
    #[must_use]
    pub fn test_router(&self) -> Router {
        let state = AppState::new(self.config.clone(), self.key_pair.clone());
        create_router(state)
    }
}

/// A server bound to its listen socket, ready to serve.
pub struct BoundServer {
    listener: TcpListener,
    config: ServerConfig,
    key_pair: Arc<KeyPair>,
}

impl BoundServer {
    /// Port the server listens on.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.config.port
    }

    /// Serves requests until a shutdown signal arrives.
    pub async fn serve(self) -> anyhow::Result<()> {
        tracing::info!(
            "Mock identity provider listening on {}{}:{}",
            self.config.protocol.scheme(),
            self.config.default_hostname,
            self.config.port
        );

        let state = AppState::new(self.config, self.key_pair);
        let app = create_router(state);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
