//! Redirect and cookie construction for completed logins.

use std::sync::Arc;

use cookie::Cookie;
use tracing::warn;

use kcmock_session::{LoginSession, PersistentSession};

use crate::token::TokenHelper;
use crate::urls::UrlConfiguration;

/// Name of the login session cookie.
pub const KEYCLOAK_SESSION_COOKIE: &str = "KEYCLOAK_SESSION";

const OOB_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";
const DUMMY_USER_ID: &str = "dummy-user-id";

/// Response types of an authorization request.
///
/// See the [OAuth 2.0 multiple response type
/// encoding](https://openid.net/specs/oauth-v2-multiple-response-types-1_0.html)
/// specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// The response carries an ID token (implicit flow).
    IdToken,
    /// The response carries an ID token and an access token (implicit flow).
    IdTokenPlusToken,
    /// The response carries an authorization code (authorization code flow).
    Code,
    /// The response carries no secrets, only the server state.
    None,
}

impl ResponseType {
    /// Parses the `response_type` value of an authorization request.
    ///
    /// Unsupported combinations such as the hybrid flow yield `None`.
    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "id_token" => Some(Self::IdToken),
            "token id_token" | "id_token token" => Some(Self::IdTokenPlusToken),
            "code" => Some(Self::Code),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    /// Effective response mode, honoring a requested override where the
    /// type allows one.
    ///
    /// Token-bearing types are always placed in the fragment; an
    /// unrecognized requested mode falls back to the type's default.
    #[must_use]
    pub fn effective_mode(self, requested: Option<&str>) -> ResponseMode {
        if !self.mode_override_allowed() {
            return self.default_mode();
        }
        requested
            .and_then(ResponseMode::from_value)
            .unwrap_or_else(|| self.default_mode())
    }

    const fn default_mode(self) -> ResponseMode {
        match self {
            Self::IdToken | Self::IdTokenPlusToken => ResponseMode::Fragment,
            Self::Code | Self::None => ResponseMode::Query,
        }
    }

    const fn mode_override_allowed(self) -> bool {
        matches!(self, Self::Code | Self::None)
    }
}

/// Placement of response parameters on the redirect URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Parameters are appended to the query string.
    Query,
    /// Parameters are placed in the fragment.
    Fragment,
}

impl ResponseMode {
    fn from_value(value: &str) -> Option<Self> {
        if value.eq_ignore_ascii_case("query") {
            Some(Self::Query)
        } else if value.eq_ignore_ascii_case("fragment") {
            Some(Self::Fragment)
        } else {
            None
        }
    }

    fn leading_separator(self, target: &str) -> char {
        match self {
            Self::Query => {
                if target.contains('?') {
                    '&'
                } else {
                    '?'
                }
            }
            Self::Fragment => '#',
        }
    }
}

fn push_parameter(location: &mut String, separator: &mut char, name: &str, value: &str) {
    location.push(*separator);
    *separator = '&';
    location.push_str(name);
    location.push('=');
    location.push_str(&urlencoding::encode(value));
}

/// Builds redirect locations and session cookies for completed logins.
#[derive(Debug, Clone)]
pub struct RedirectHelper {
    token_helper: Arc<TokenHelper>,
}

impl RedirectHelper {
    /// Creates a helper issuing tokens through the given token helper.
    #[must_use]
    pub fn new(token_helper: Arc<TokenHelper>) -> Self {
        Self { token_helper }
    }

    /// Builds the redirect back to the client for a completed login.
    ///
    /// Parameters are appended in a fixed order: `state` when present,
    /// `session_state`, then the response type specific parameters. The
    /// session ID doubles as the authorization code. Returns `None` when the
    /// requested response type is unsupported or no token can be issued.
    #[must_use]
    pub fn redirect_location(
        &self,
        session: &PersistentSession,
        urls: &UrlConfiguration,
    ) -> Option<String> {
        let Some(response_type) = ResponseType::from_value(session.response_type()) else {
            warn!(
                response_type = session.response_type(),
                "invalid response type requested"
            );
            return None;
        };
        let token = match self.token_helper.token(session, urls) {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    session_id = session.session_id(),
                    error = %e,
                    "no token available for session"
                );
                return None;
            }
        };

        let mut location = if session.redirect_uri() == OOB_REDIRECT {
            urls.out_of_band_login_endpoint()
        } else {
            session.redirect_uri().to_string()
        };
        let mode = response_type.effective_mode(session.response_mode());
        let mut separator = mode.leading_separator(&location);
        if let Some(state) = session.state() {
            push_parameter(&mut location, &mut separator, "state", state);
        }
        push_parameter(
            &mut location,
            &mut separator,
            "session_state",
            session.session_id(),
        );
        match response_type {
            ResponseType::Code => {
                push_parameter(&mut location, &mut separator, "code", session.session_id());
            }
            ResponseType::IdToken => {
                push_parameter(&mut location, &mut separator, "id_token", &token);
            }
            ResponseType::IdTokenPlusToken => {
                push_parameter(&mut location, &mut separator, "id_token", &token);
                push_parameter(&mut location, &mut separator, "access_token", &token);
                push_parameter(&mut location, &mut separator, "token_type", "bearer");
            }
            ResponseType::None => {}
        }
        Some(location)
    }

    /// Builds the login session cookie.
    #[must_use]
    pub fn session_cookie(
        &self,
        session: &PersistentSession,
        urls: &UrlConfiguration,
    ) -> Cookie<'static> {
        Cookie::build((
            KEYCLOAK_SESSION_COOKIE,
            format!(
                "{}/{}/{}",
                urls.realm(),
                DUMMY_USER_ID,
                session.session_id()
            ),
        ))
        .path(urls.issuer_path())
        .max_age(time::Duration::seconds(36_000))
        .secure(false)
        .build()
    }

    /// Builds a cookie that invalidates the login session cookie.
    #[must_use]
    pub fn invalidate_cookie(&self, urls: &UrlConfiguration) -> Cookie<'static> {
        Cookie::build((
            KEYCLOAK_SESSION_COOKIE,
            format!("{}/{}", urls.realm(), DUMMY_USER_ID),
        ))
        .path(urls.issuer_path())
        .max_age(time::Duration::ZERO)
        .secure(false)
        .build()
    }
}
