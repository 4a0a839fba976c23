//! Server configuration for the mock.
//!
//! Defaults mirror a stock Keycloak installation: realm `master`, context
//! path `/auth`, port 8000.

use serde::{Deserialize, Serialize};

/// Protocol the server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Protocol {
    /// URL scheme including the `://` separator.
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http://",
            Self::Https => "https://",
        }
    }

    /// Well-known port of the protocol.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// How roles entered on the login page are mapped into issued tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginRoleMapping {
    /// Roles become realm roles.
    #[default]
    ToRealm,
    /// Roles become resource roles of the client and all default audiences.
    ToResource,
    /// Roles are applied both as realm roles and as resource roles.
    ToBoth,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to bind to. `0` selects an ephemeral port.
    pub port: u16,
    /// Protocol served by the mock.
    pub protocol: Protocol,
    /// Default hostname used in issuer URLs.
    pub default_hostname: String,
    /// Context path prefix, e.g. `/auth`. Empty means no prefix.
    pub context_path: String,
    /// Default realm used in issuer URLs.
    pub default_realm: String,
    /// Audiences added to every token issued through a login flow.
    pub default_audiences: Vec<String>,
    /// Scopes added to every token issued through a login flow.
    pub default_scopes: Vec<String>,
    /// Token lifespan in seconds applied when a token sets no expiry of its own.
    pub default_token_lifespan_secs: u64,
    /// Mapping applied to roles entered on the login page.
    pub login_role_mapping: LoginRoleMapping,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            protocol: Protocol::Http,
            default_hostname: "localhost".to_string(),
            context_path: "/auth".to_string(),
            default_realm: "master".to_string(),
            default_audiences: vec!["server".to_string()],
            default_scopes: vec!["openid".to_string()],
            default_token_lifespan_secs: 36_000,
            login_role_mapping: LoginRoleMapping::default(),
        }
    }
}

impl ServerConfig {
    /// Context path normalized to either `""` or `/segment[/more]` form.
    ///
    /// Leading and trailing slashes in the configured value are ignored, so
    /// `auth`, `/auth` and `auth/` all resolve to `/auth`.
    #[must_use]
    pub fn normalized_context_path(&self) -> String {
        let trimmed = self.context_path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }
}
