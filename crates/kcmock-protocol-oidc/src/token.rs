//! Token signing and parsing.
//!
//! [`TokenGenerator`] turns a resolved [`TokenConfig`] into a signed compact
//! token and verifies presented tokens against the same key pair.
//! [`TokenHelper`] builds the token configuration for a login session,
//! applying the server-wide audience, scope, lifespan and role mapping
//! defaults.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{Header, Validation, decode, encode};
use serde_json::Value;

use kcmock_core::{LoginRoleMapping, ServerConfig};
use kcmock_crypto::KeyPair;
use kcmock_session::{LoginSession, UserData};

use crate::error::{TokenParseError, TokenParseResult, TokenSigningError};
use crate::token_config::{TokenConfig, TokenOptions};
use crate::urls::UrlConfiguration;

/// Claims that extra claims may never overwrite.
const PROTECTED_CLAIMS: [&str; 5] = ["iss", "sub", "exp", "aud", "iat"];

/// Signs and parses tokens with a fixed key pair.
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    key_pair: Arc<KeyPair>,
}

impl TokenGenerator {
    /// Creates a generator for the given key pair.
    #[must_use]
    pub fn new(key_pair: Arc<KeyPair>) -> Self {
        Self { key_pair }
    }

    /// Signs a token for the given claim set.
    ///
    /// The issuer is resolved against `urls`, honoring the hostname and
    /// realm overrides carried by the claim set.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing operation itself fails.
    pub fn sign(
        &self,
        config: &TokenConfig,
        urls: &UrlConfiguration,
    ) -> Result<String, TokenSigningError> {
        let request_urls = urls.for_request_context(config.hostname(), config.realm());
        let generated_user = config
            .generate_user_data()
            .then(|| UserData::from_username_and_hostname(config.subject(), request_urls.hostname()));

        let mut claims = serde_json::Map::new();
        claims.insert(
            "aud".to_string(),
            Value::Array(
                config
                    .audience()
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
        claims.insert("iat".to_string(), config.issued_at().timestamp().into());
        claims.insert(
            "auth_time".to_string(),
            config.authentication_time().timestamp().into(),
        );
        claims.insert("exp".to_string(), config.expiration().timestamp().into());
        claims.insert("iss".to_string(), Value::String(request_urls.issuer()));
        claims.insert(
            "sub".to_string(),
            Value::String(config.subject().to_string()),
        );
        claims.insert("scope".to_string(), Value::String(config.scope()));
        claims.insert("typ".to_string(), Value::String("Bearer".to_string()));
        claims.insert(
            "azp".to_string(),
            Value::String(config.authorized_party().to_string()),
        );
        if let Some(not_before) = config.not_before() {
            claims.insert("nbf".to_string(), not_before.timestamp().into());
        }
        set_claim_if_present(
            &mut claims,
            "name",
            config
                .name()
                .map(String::from)
                .or_else(|| generated_user.as_ref().map(UserData::name)),
        );
        set_claim_if_present(
            &mut claims,
            "given_name",
            config.given_name().map(String::from).or_else(|| {
                generated_user
                    .as_ref()
                    .and_then(|user| user.given_name().map(String::from))
            }),
        );
        set_claim_if_present(
            &mut claims,
            "family_name",
            config
                .family_name()
                .map(String::from)
                .or_else(|| generated_user.as_ref().map(|user| user.family_name().to_string())),
        );
        set_claim_if_present(
            &mut claims,
            "email",
            config
                .email()
                .map(String::from)
                .or_else(|| generated_user.as_ref().map(|user| user.email().to_string())),
        );
        set_claim_if_present(
            &mut claims,
            "preferred_username",
            config.preferred_username().map(String::from).or_else(|| {
                generated_user
                    .as_ref()
                    .map(|user| user.preferred_username().to_string())
            }),
        );
        set_claim_if_present(&mut claims, "acr", config.acr().map(String::from));
        claims.insert(
            "realm_access".to_string(),
            roles_value(&config.realm_access().roles),
        );
        claims.insert(
            "resource_access".to_string(),
            Value::Object(
                config
                    .resource_access()
                    .iter()
                    .map(|(resource, access)| (resource.clone(), roles_value(&access.roles)))
                    .collect(),
            ),
        );
        for (claim, value) in config.claims() {
            if !PROTECTED_CLAIMS.contains(&claim.as_str()) {
                claims.insert(claim.clone(), value.clone());
            }
        }

        let mut header = Header::new(self.key_pair.algorithm());
        header.kid = Some(self.key_pair.key_id().to_string());
        header.typ = Some("JWT".to_string());
        encode(&header, &claims, self.key_pair.encoding_key())
            .map_err(|e| TokenSigningError(e.to_string()))
    }

    /// Verifies a token signature and returns its claims.
    ///
    /// Expiry and audience are not checked; callers apply their own rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed or the signature does not
    /// verify.
    pub fn parse(&self, token: &str) -> TokenParseResult<serde_json::Map<String, Value>> {
        let mut validation = Validation::new(self.key_pair.algorithm());
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();
        let data = decode::<serde_json::Map<String, Value>>(
            token,
            self.key_pair.decoding_key(),
            &validation,
        )
        .map_err(|e| TokenParseError::Malformed(e.to_string()))?;
        Ok(data.claims)
    }
}

fn set_claim_if_present(
    claims: &mut serde_json::Map<String, Value>,
    claim: &str,
    value: Option<String>,
) {
    if let Some(value) = value {
        claims.insert(claim.to_string(), Value::String(value));
    }
}

fn roles_value(roles: &BTreeSet<String>) -> Value {
    let mut access = serde_json::Map::new();
    access.insert(
        "roles".to_string(),
        Value::Array(roles.iter().cloned().map(Value::String).collect()),
    );
    Value::Object(access)
}

/// Issues tokens for login sessions using the server defaults.
#[derive(Debug, Clone)]
pub struct TokenHelper {
    generator: Arc<TokenGenerator>,
    default_audiences: Vec<String>,
    default_scopes: Vec<String>,
    token_lifespan: Duration,
    login_role_mapping: LoginRoleMapping,
}

impl TokenHelper {
    /// Creates a helper bound to the server configuration.
    #[must_use]
    pub fn new(generator: Arc<TokenGenerator>, config: &ServerConfig) -> Self {
        let token_lifespan = i64::try_from(config.default_token_lifespan_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::hours(10));
        Self {
            generator,
            default_audiences: config.default_audiences.clone(),
            default_scopes: config.default_scopes.clone(),
            token_lifespan,
            login_role_mapping: config.login_role_mapping,
        }
    }

    /// Issues a token for the given session.
    ///
    /// The access token, ID token and refresh token of this server are all
    /// the same value.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn token(
        &self,
        session: &dyn LoginSession,
        urls: &UrlConfiguration,
    ) -> Result<String, TokenSigningError> {
        let user = session.user();
        let mut audience: BTreeSet<String> = self.default_audiences.iter().cloned().collect();
        audience.insert(session.client_id().to_string());
        let mut options = TokenOptions {
            audience,
            authorized_party: Some(session.client_id().to_string()),
            subject: Some(user.subject().to_string()),
            preferred_username: Some(user.preferred_username().to_string()),
            given_name: user.given_name().map(String::from),
            family_name: Some(user.family_name().to_string()),
            name: Some(user.name()),
            email: Some(user.email().to_string()),
            session_id: Some(session.session_id().to_string()),
            // No real authorization happens here, so claim ISO/IEC 29115
            // level 1.
            acr: Some("1".to_string()),
            scopes: self.default_scopes.clone(),
            token_lifespan: Some(self.token_lifespan),
            ..TokenOptions::default()
        };
        if let Some(nonce) = session.nonce() {
            options
                .claims
                .insert("nonce".to_string(), Value::String(nonce.to_string()));
        }
        match self.login_role_mapping {
            LoginRoleMapping::ToRealm => {
                options.realm_roles.extend(session.roles().iter().cloned());
            }
            LoginRoleMapping::ToResource => {
                self.add_resource_roles(&mut options, session);
            }
            LoginRoleMapping::ToBoth => {
                options.realm_roles.extend(session.roles().iter().cloned());
                self.add_resource_roles(&mut options, session);
            }
        }
        self.generator.sign(&TokenConfig::new(options), urls)
    }

    /// Verifies a token signature and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is malformed or the signature does not
    /// verify.
    pub fn parse(&self, token: &str) -> TokenParseResult<serde_json::Map<String, Value>> {
        self.generator.parse(token)
    }

    fn add_resource_roles(&self, options: &mut TokenOptions, session: &dyn LoginSession) {
        let resources = std::iter::once(session.client_id())
            .chain(self.default_audiences.iter().map(String::as_str));
        for resource in resources {
            options
                .resource_access
                .entry(resource.to_string())
                .or_default()
                .roles
                .extend(session.roles().iter().cloned());
        }
    }
}
