//! OpenID provider metadata.
//!
//! The discovery document served under
//! `/.well-known/openid-configuration`, as defined in
//! [OpenID Connect Discovery 1.0](https://openid.net/specs/openid-connect-discovery-1_0.html).

use serde::{Deserialize, Serialize};

use crate::urls::UrlConfiguration;

/// OpenID provider metadata for one issuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer URL.
    pub issuer: String,

    /// Authorization endpoint URL.
    pub authorization_endpoint: String,

    /// Token endpoint URL.
    pub token_endpoint: String,

    /// Token introspection endpoint URL.
    pub introspection_endpoint: String,

    /// JWKS endpoint URL.
    pub jwks_uri: String,

    /// End session (logout) endpoint URL.
    pub end_session_endpoint: String,

    /// Supported response types.
    pub response_types_supported: Vec<String>,

    /// Supported subject identifier types.
    pub subject_types_supported: Vec<String>,

    /// Supported ID token signing algorithms.
    pub id_token_signing_alg_values_supported: Vec<String>,
}

impl ProviderMetadata {
    /// Builds the metadata document for an already resolved issuer.
    #[must_use]
    pub fn for_urls(urls: &UrlConfiguration) -> Self {
        Self {
            issuer: urls.issuer(),
            authorization_endpoint: urls.authorization_endpoint(),
            token_endpoint: urls.token_endpoint(),
            introspection_endpoint: urls.token_introspection_endpoint(),
            jwks_uri: urls.jwks_uri(),
            end_session_endpoint: urls.end_session_endpoint(),
            response_types_supported: vec![
                "code".to_string(),
                "code id_token".to_string(),
                "id_token".to_string(),
                "token id_token".to_string(),
            ],
            subject_types_supported: vec!["public".to_string()],
            id_token_signing_alg_values_supported: vec!["RS256".to_string()],
        }
    }
}
