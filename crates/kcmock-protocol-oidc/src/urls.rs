//! Issuer and endpoint URL resolution.
//!
//! URLs are resolved once from the server configuration and narrowed per
//! request: the Host header and the realm path parameter of an incoming
//! request override the configured values, so issued tokens carry the issuer
//! the client actually used.

use kcmock_core::{Protocol, ServerConfig};

/// Resolved URL context that tokens and endpoints are generated for.
#[derive(Debug, Clone)]
pub struct UrlConfiguration {
    protocol: Protocol,
    hostname: String,
    context_path: String,
    realm: String,
}

impl UrlConfiguration {
    /// Resolves the URL context from the server configuration.
    ///
    /// The configured port becomes part of the hostname unless it is the
    /// protocol default or the hostname already carries an explicit port.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let hostname = if config.port == config.protocol.default_port()
            || config.default_hostname.contains(':')
        {
            config.default_hostname.clone()
        } else {
            format!("{}:{}", config.default_hostname, config.port)
        };
        Self {
            protocol: config.protocol,
            hostname,
            context_path: config.normalized_context_path(),
            realm: config.default_realm.clone(),
        }
    }

    /// Narrows the context to a single request.
    ///
    /// A request host is taken verbatim, including any port it carries.
    #[must_use]
    pub fn for_request_context(
        &self,
        request_host: Option<&str>,
        request_realm: Option<&str>,
    ) -> Self {
        Self {
            protocol: self.protocol,
            hostname: request_host.unwrap_or(&self.hostname).to_string(),
            context_path: self.context_path.clone(),
            realm: request_realm.unwrap_or(&self.realm).to_string(),
        }
    }

    /// Base URL of the server, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!(
            "{}{}{}",
            self.protocol.scheme(),
            self.hostname,
            self.context_path
        )
    }

    /// Issuer URL of the realm.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!("{}/realms/{}", self.base_url(), self.realm)
    }

    /// Path component of the issuer URL, with a trailing slash.
    ///
    /// Session cookies are scoped to this path.
    #[must_use]
    pub fn issuer_path(&self) -> String {
        format!("{}/realms/{}/", self.context_path, self.realm)
    }

    fn openid_path(&self, path: &str) -> String {
        format!("{}/protocol/openid-connect/{path}", self.issuer())
    }

    /// Authorization endpoint serving the login page.
    #[must_use]
    pub fn authorization_endpoint(&self) -> String {
        self.openid_path("auth")
    }

    /// Endpoint the login form posts back to.
    #[must_use]
    pub fn authentication_callback_endpoint(&self, session_id: &str) -> String {
        self.openid_path(&format!("authenticate/{session_id}"))
    }

    /// Token endpoint.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        self.openid_path("token")
    }

    /// Token introspection endpoint.
    #[must_use]
    pub fn token_introspection_endpoint(&self) -> String {
        self.openid_path("token/introspect")
    }

    /// JWKS document URL.
    #[must_use]
    pub fn jwks_uri(&self) -> String {
        self.openid_path("certs")
    }

    /// End-session endpoint.
    #[must_use]
    pub fn end_session_endpoint(&self) -> String {
        self.openid_path("logout")
    }

    /// Page displaying the authorization code for out-of-band logins.
    #[must_use]
    pub fn out_of_band_login_endpoint(&self) -> String {
        self.openid_path("oob")
    }

    /// Base URL for static resources such as the adapter script.
    ///
    /// Resources are shared across realms, so this extends the context path
    /// rather than the issuer.
    #[must_use]
    pub fn resources_url(&self) -> String {
        format!("{}/js", self.base_url())
    }

    /// Hostname the context resolves to, including a port when it differs
    /// from the protocol default.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Realm the context resolves to.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }
}
