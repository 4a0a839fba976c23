//! Claim set description for a single token.
//!
//! A [`TokenOptions`] value carries everything a caller wants in a token;
//! [`TokenConfig::new`] resolves it into an immutable claim set with all
//! defaults applied. Options can also be pre-filled from an existing token
//! with [`TokenOptions::from_token`] and customized before building.

use std::collections::{BTreeMap, BTreeSet};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{TokenParseError, TokenParseResult};

const DEFAULT_SCOPE: &str = "openid";

/// Role container for the `realm_access` and `resource_access` claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    /// Granted roles.
    pub roles: BTreeSet<String>,
}

/// Parameters for building a [`TokenConfig`].
///
/// Every field is optional; [`TokenConfig::new`] fills in the documented
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct TokenOptions {
    /// Audiences of the token. Defaults to `server` when empty.
    pub audience: BTreeSet<String>,
    /// Authorized party (`azp`). Defaults to `client`.
    pub authorized_party: Option<String>,
    /// Subject. Defaults to `user`.
    pub subject: Option<String>,
    /// Derive identity claims from the subject at signing time.
    pub generate_user_data: bool,
    /// Scopes in addition to the always-present `openid`.
    pub scopes: Vec<String>,
    /// Extra claims, merged last on signing.
    pub claims: serde_json::Map<String, Value>,
    /// Realm roles.
    pub realm_roles: BTreeSet<String>,
    /// Roles per resource.
    pub resource_access: BTreeMap<String, Access>,
    /// Session ID (`sid`). Defaults to a random UUID.
    pub session_id: Option<String>,
    /// Issue timestamp. Defaults to now.
    pub issued_at: Option<DateTime<Utc>>,
    /// Authentication timestamp. Defaults to now.
    pub authentication_time: Option<DateTime<Utc>>,
    /// Expiration timestamp. Takes precedence over `token_lifespan`.
    pub expiration: Option<DateTime<Utc>>,
    /// Token lifespan, applied to the issue timestamp. Defaults to ten hours.
    pub token_lifespan: Option<Duration>,
    /// Not-before timestamp. Omitted from the token when absent.
    pub not_before: Option<DateTime<Utc>>,
    /// Issuer hostname override.
    pub hostname: Option<String>,
    /// Issuer realm override.
    pub realm: Option<String>,
    /// Full name. Defaults to the given and family name when those are set.
    pub name: Option<String>,
    /// Given name.
    pub given_name: Option<String>,
    /// Family name.
    pub family_name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Preferred username.
    pub preferred_username: Option<String>,
    /// Authentication context class reference (`acr`).
    pub acr: Option<String>,
}

impl TokenOptions {
    /// Pre-fills options from an existing token.
    ///
    /// The token payload is decoded without signature verification, so this
    /// also works for tokens issued elsewhere. Timing claims and the session
    /// ID are deliberately not taken over; unknown claims are preserved as
    /// extra claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be decoded or a recognized
    /// claim has an unusable value.
    pub fn from_token(token: &str) -> TokenParseResult<Self> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| TokenParseError::Malformed("token has no payload".to_string()))?;
        let decoded = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| TokenParseError::Malformed(format!("payload is not base64url: {e}")))?;
        let claims: serde_json::Map<String, Value> = serde_json::from_slice(&decoded)
            .map_err(|e| TokenParseError::Malformed(format!("payload is not a JSON object: {e}")))?;

        let mut options = Self::default();
        for (key, value) in claims {
            match key.as_str() {
                "aud" => match value {
                    Value::String(audience) => {
                        options.audience.insert(audience);
                    }
                    Value::Array(audiences) => {
                        for audience in audiences {
                            options.audience.insert(string_claim("aud", audience)?);
                        }
                    }
                    other => return Err(unusable_claim("aud", &other)),
                },
                "azp" => options.authorized_party = Some(string_claim(&key, value)?),
                "sub" => options.subject = Some(string_claim(&key, value)?),
                "name" => options.name = Some(string_claim(&key, value)?),
                "given_name" => options.given_name = Some(string_claim(&key, value)?),
                "family_name" => options.family_name = Some(string_claim(&key, value)?),
                "email" => options.email = Some(string_claim(&key, value)?),
                "preferred_username" => {
                    options.preferred_username = Some(string_claim(&key, value)?);
                }
                "acr" => options.acr = Some(string_claim(&key, value)?),
                "scope" => {
                    let scope = string_claim(&key, value)?;
                    options
                        .scopes
                        .extend(scope.split(' ').filter(|s| !s.is_empty()).map(String::from));
                }
                "realm_access" => {
                    options.realm_roles.extend(roles_claim(&key, value)?);
                }
                "resource_access" => {
                    let Value::Object(resources) = value else {
                        return Err(unusable_claim(&key, &value));
                    };
                    for (resource, access) in resources {
                        let roles = roles_claim(&key, access)?;
                        options
                            .resource_access
                            .entry(resource)
                            .or_default()
                            .roles
                            .extend(roles);
                    }
                }
                "typ" => {
                    let typ = string_claim(&key, value)?;
                    if typ != "Bearer" {
                        return Err(TokenParseError::UnusableSource(format!(
                            "typ is '{typ}', expected 'Bearer'"
                        )));
                    }
                }
                "iss" => {
                    let issuer = string_claim(&key, value)?;
                    let (hostname, realm) = split_issuer(&issuer)?;
                    options.hostname = Some(hostname);
                    options.realm = Some(realm);
                }
                // Timing claims and the session ID are regenerated on build.
                "sid" | "session_state" | "iat" | "nbf" | "exp" | "auth_time" => {}
                _ => {
                    options.claims.insert(key, value);
                }
            }
        }
        Ok(options)
    }
}

fn string_claim(key: &str, value: Value) -> TokenParseResult<String> {
    match value {
        Value::String(value) => Ok(value),
        other => Err(unusable_claim(key, &other)),
    }
}

fn roles_claim(key: &str, value: Value) -> TokenParseResult<Vec<String>> {
    let Value::Object(mut access) = value else {
        return Err(unusable_claim(key, &value));
    };
    match access.remove("roles") {
        None => Ok(Vec::new()),
        Some(Value::Array(roles)) => roles
            .into_iter()
            .map(|role| string_claim(key, role))
            .collect(),
        Some(other) => Err(unusable_claim(key, &other)),
    }
}

fn unusable_claim(key: &str, value: &Value) -> TokenParseError {
    TokenParseError::UnusableSource(format!("claim '{key}' has unusable value {value}"))
}

/// Splits an issuer URL into its bare hostname and the realm named by the
/// last path segment.
fn split_issuer(issuer: &str) -> TokenParseResult<(String, String)> {
    let rest = issuer
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(issuer);
    let (authority, path) = match rest.find('/') {
        Some(index) => rest.split_at(index),
        None => (rest, ""),
    };
    let authority = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    let hostname = authority.split(':').next().unwrap_or_default();
    if hostname.is_empty() {
        return Err(TokenParseError::UnusableSource(format!(
            "issuer '{issuer}' has no hostname"
        )));
    }
    let realm = path
        .rsplit_once("/realms/")
        .map(|(_, realm)| realm)
        .filter(|realm| !realm.is_empty() && !realm.contains('/'))
        .ok_or_else(|| {
            TokenParseError::UnusableSource(format!(
                "issuer '{issuer}' does not end in a /realms/<realm> path"
            ))
        })?;
    Ok((hostname.to_string(), realm.to_string()))
}

/// Immutable claim set for one token, with all defaults resolved.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    audience: BTreeSet<String>,
    authorized_party: String,
    subject: String,
    generate_user_data: bool,
    scopes: Vec<String>,
    claims: serde_json::Map<String, Value>,
    realm_access: Access,
    resource_access: BTreeMap<String, Access>,
    session_id: String,
    issued_at: DateTime<Utc>,
    authentication_time: DateTime<Utc>,
    expiration: DateTime<Utc>,
    not_before: Option<DateTime<Utc>>,
    hostname: Option<String>,
    realm: Option<String>,
    name: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    email: Option<String>,
    preferred_username: Option<String>,
    acr: Option<String>,
}

impl TokenConfig {
    /// Resolves options into a claim set.
    #[must_use]
    pub fn new(options: TokenOptions) -> Self {
        let now = Utc::now();
        let issued_at = options.issued_at.unwrap_or(now);
        let expiration = options.expiration.unwrap_or_else(|| {
            issued_at + options.token_lifespan.unwrap_or_else(|| Duration::hours(10))
        });
        let audience = if options.audience.is_empty() {
            BTreeSet::from(["server".to_string()])
        } else {
            options.audience
        };
        let name = options.name.or_else(|| match &options.given_name {
            Some(given) => match &options.family_name {
                Some(family) => Some(format!("{given} {family}")),
                None => Some(given.clone()),
            },
            None => options.family_name.clone(),
        });
        Self {
            audience,
            authorized_party: options
                .authorized_party
                .unwrap_or_else(|| "client".to_string()),
            subject: options.subject.unwrap_or_else(|| "user".to_string()),
            generate_user_data: options.generate_user_data,
            scopes: options.scopes,
            claims: options.claims,
            realm_access: Access {
                roles: options.realm_roles,
            },
            resource_access: options.resource_access,
            session_id: options
                .session_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            issued_at,
            authentication_time: options.authentication_time.unwrap_or(now),
            expiration,
            not_before: options.not_before,
            hostname: options.hostname,
            realm: options.realm,
            name,
            given_name: options.given_name,
            family_name: options.family_name,
            email: options.email,
            preferred_username: options.preferred_username,
            acr: options.acr,
        }
    }

    /// Audiences. Never empty.
    #[must_use]
    pub fn audience(&self) -> &BTreeSet<String> {
        &self.audience
    }

    /// Authorized party.
    #[must_use]
    pub fn authorized_party(&self) -> &str {
        &self.authorized_party
    }

    /// Subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Whether identity claims are derived from the subject at signing time.
    #[must_use]
    pub const fn generate_user_data(&self) -> bool {
        self.generate_user_data
    }

    /// Space separated scope claim value, always led by `openid`.
    #[must_use]
    pub fn scope(&self) -> String {
        let mut value = String::from(DEFAULT_SCOPE);
        for scope in &self.scopes {
            if scope != DEFAULT_SCOPE {
                value.push(' ');
                value.push_str(scope);
            }
        }
        value
    }

    /// Extra claims.
    #[must_use]
    pub fn claims(&self) -> &serde_json::Map<String, Value> {
        &self.claims
    }

    /// Realm roles.
    #[must_use]
    pub fn realm_access(&self) -> &Access {
        &self.realm_access
    }

    /// Roles per resource.
    #[must_use]
    pub fn resource_access(&self) -> &BTreeMap<String, Access> {
        &self.resource_access
    }

    /// Session ID.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Issue timestamp.
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Authentication timestamp.
    #[must_use]
    pub const fn authentication_time(&self) -> DateTime<Utc> {
        self.authentication_time
    }

    /// Expiration timestamp.
    #[must_use]
    pub const fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// Not-before timestamp, if any.
    #[must_use]
    pub const fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    /// Issuer hostname override, if any.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Issuer realm override, if any.
    #[must_use]
    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    /// Full name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Given name, if any.
    #[must_use]
    pub fn given_name(&self) -> Option<&str> {
        self.given_name.as_deref()
    }

    /// Family name, if any.
    #[must_use]
    pub fn family_name(&self) -> Option<&str> {
        self.family_name.as_deref()
    }

    /// Email address, if any.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Preferred username, if any.
    #[must_use]
    pub fn preferred_username(&self) -> Option<&str> {
        self.preferred_username.as_deref()
    }

    /// Authentication context class reference, if any.
    #[must_use]
    pub fn acr(&self) -> Option<&str> {
        self.acr.as_deref()
    }
}
