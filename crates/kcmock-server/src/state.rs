//! Application state management.
//!
//! This module defines the shared state that is passed to all request handlers.

use std::sync::Arc;

use axum::http::{HeaderMap, header};
use kcmock_core::ServerConfig;
use kcmock_crypto::KeyPair;
use kcmock_protocol_oidc::{
    JsonWebKeySet, RedirectHelper, TokenGenerator, TokenHelper, UrlConfiguration,
};
use kcmock_session::SessionRepository;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: ServerConfig,

    urls: Arc<UrlConfiguration>,
    repository: Arc<SessionRepository>,
    token_helper: Arc<TokenHelper>,
    redirect: Arc<RedirectHelper>,
    key_set: Arc<JsonWebKeySet>,
}

impl AppState {
    /// Creates a new application state around one signing key pair.
    #[must_use]
    pub fn new(config: ServerConfig, key_pair: Arc<KeyPair>) -> Self {
        let urls = Arc::new(UrlConfiguration::new(&config));
        let key_set = Arc::new(JsonWebKeySet::from_key_pair(&key_pair));
        let generator = Arc::new(TokenGenerator::new(key_pair));
        let token_helper = Arc::new(TokenHelper::new(generator, &config));
        let redirect = Arc::new(RedirectHelper::new(token_helper.clone()));
        Self {
            config,
            urls,
            repository: Arc::new(SessionRepository::new()),
            token_helper,
            redirect,
            key_set,
        }
    }

    /// Resolves the URL configuration for one request.
    ///
    /// The request host, when present, takes precedence over the configured
    /// hostname; same for the realm taken from the request path.
    #[must_use]
    pub fn request_urls(&self, headers: &HeaderMap, realm: &str) -> UrlConfiguration {
        self.urls
            .for_request_context(request_host(headers), Some(realm))
    }

    /// Returns the session repository.
    #[must_use]
    pub fn repository(&self) -> &SessionRepository {
        &self.repository
    }

    /// Returns the helper converting sessions into signed tokens.
    #[must_use]
    pub fn token_helper(&self) -> &TokenHelper {
        &self.token_helper
    }

    /// Returns the helper building redirect responses and session cookies.
    #[must_use]
    pub fn redirect(&self) -> &RedirectHelper {
        &self.redirect
    }

    /// Returns the published key set.
    #[must_use]
    pub fn key_set(&self) -> &JsonWebKeySet {
        &self.key_set
    }
}

/// Host header of a request, if one was sent.
fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::HOST).and_then(|value| value.to_str().ok())
}
