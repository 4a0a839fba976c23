//! Protocol endpoint handlers.
//!
//! The JSON and redirect endpoints of the mock: token exchange for all four
//! supported grant types, token introspection, the JWKS document, the
//! discovery document and logout.

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use kcmock_protocol_oidc::{
    JsonWebKeySet, KEYCLOAK_SESSION_COOKIE, ProviderMetadata, UrlConfiguration,
};
use kcmock_session::{AdHocSession, LoginSession};

use crate::state::AppState;

/// Form payload of the token endpoint.
///
/// All fields are optional at the parsing stage; each grant type enforces
/// the ones it needs.
#[derive(Debug, Deserialize)]
pub struct TokenRequestForm {
    /// OAuth grant type selecting the flow.
    pub grant_type: Option<String>,
    /// Authorization code, used by the `authorization_code` grant.
    pub code: Option<String>,
    /// Refresh token, used by the `refresh_token` grant.
    pub refresh_token: Option<String>,
    /// Client ID for direct grants.
    pub client_id: Option<String>,
    /// Client secret, read as a comma separated role list.
    pub client_secret: Option<String>,
    /// Username for the `password` grant.
    pub username: Option<String>,
    /// Password for the `password` grant, read as a comma separated role list.
    pub password: Option<String>,
}

/// Token endpoint response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed access token.
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Refresh token; the same signed value as the access token.
    pub refresh_token: String,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: u64,
    /// ID token; the same signed value as the access token.
    pub id_token: String,
    /// Session the token belongs to, if one exists.
    pub session_state: Option<String>,
}

impl TokenResponse {
    fn new(token: String, session_state: Option<String>) -> Self {
        Self {
            access_token: token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: 36_000,
            refresh_token: token.clone(),
            refresh_expires_in: 36_000,
            id_token: token,
            session_state,
        }
    }
}

/// Query parameters of the logout endpoint.
#[derive(Debug, Deserialize)]
pub struct LogoutQuery {
    /// URI to redirect to after logout.
    pub redirect_uri: Option<String>,
}

/// Serves the token endpoint, dispatching on `grant_type`.
pub async fn token(
    State(state): State<AppState>,
    Path(realm): Path<String>,
    headers: HeaderMap,
    Form(form): Form<TokenRequestForm>,
) -> Response {
    let urls = state.request_urls(&headers, &realm);
    match form.grant_type.as_deref() {
        Some("authorization_code") => authorization_code_grant(&state, &urls, form),
        Some("refresh_token") => refresh_token_grant(&state, form),
        Some("password") => password_grant(&state, &urls, &headers, form),
        Some("client_credentials") => client_credentials_grant(&state, &urls, &headers, form),
        _ => (StatusCode::BAD_REQUEST, "Unsupported grant type").into_response(),
    }
}

fn authorization_code_grant(
    state: &AppState,
    urls: &UrlConfiguration,
    form: TokenRequestForm,
) -> Response {
    // The authorization code is the session ID.
    let Some(code) = form.code.filter(|value| !value.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing authorization code").into_response();
    };
    let Some(session) = state.repository().get_session(&code) else {
        tracing::warn!(%code, "token requested for unknown authorization code");
        return (StatusCode::NOT_FOUND, "Unknown authorization code").into_response();
    };
    issue_token(state, session.as_ref(), urls)
}

fn refresh_token_grant(state: &AppState, form: TokenRequestForm) -> Response {
    let Some(refresh_token) = form.refresh_token.filter(|value| !value.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing refresh token").into_response();
    };
    let claims = match state.token_helper().parse(&refresh_token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(error = %e, "refresh token rejected");
            return (StatusCode::BAD_REQUEST, "Invalid refresh token").into_response();
        }
    };
    let session_state = claims
        .get("session_state")
        .and_then(Value::as_str)
        .map(str::to_string);
    // The presented token is echoed back unchanged.
    Json(TokenResponse::new(refresh_token, session_state)).into_response()
}

fn password_grant(
    state: &AppState,
    urls: &UrlConfiguration,
    headers: &HeaderMap,
    form: TokenRequestForm,
) -> Response {
    let client_id = form
        .client_id
        .filter(|value| !value.is_empty())
        .or_else(|| basic_credentials(headers).map(|(username, _)| username))
        .filter(|value| !value.is_empty());
    let Some(client_id) = client_id else {
        return (StatusCode::BAD_REQUEST, "Missing client_id").into_response();
    };
    let Some(username) = form.username.filter(|value| !value.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing username").into_response();
    };

    let session = AdHocSession::from_credentials(
        &client_id,
        urls.hostname(),
        &username,
        form.password.as_deref(),
    );
    issue_token(state, &session, urls)
}

fn client_credentials_grant(
    state: &AppState,
    urls: &UrlConfiguration,
    headers: &HeaderMap,
    form: TokenRequestForm,
) -> Response {
    let form_client = form.client_id.filter(|value| !value.is_empty());
    let form_secret = form.client_secret.filter(|value| !value.is_empty());
    let (client_id, roles) = match (form_client, form_secret) {
        (Some(client_id), Some(secret)) => (client_id, Some(secret)),
        _ => {
            let Some(credentials) = basic_credentials(headers) else {
                return (StatusCode::UNAUTHORIZED, "Client credentials required").into_response();
            };
            credentials
        }
    };
    if client_id.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing client_id").into_response();
    }

    // The client authenticates as itself; the secret carries the roles.
    let session = AdHocSession::from_credentials(
        &client_id,
        urls.hostname(),
        &client_id,
        roles.as_deref(),
    );
    issue_token(state, &session, urls)
}

fn issue_token(state: &AppState, session: &dyn LoginSession, urls: &UrlConfiguration) -> Response {
    match state.token_helper().token(session, urls) {
        Ok(token) => {
            let session_state = Some(session.session_id().to_string());
            Json(TokenResponse::new(token, session_state)).into_response()
        }
        Err(e) => {
            tracing::error!(session_id = session.session_id(), error = %e, "token signing failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Serves the token introspection endpoint.
///
/// Per RFC 7662 a bad token is not a client error; the response degrades to
/// `{"active": false}` instead.
pub async fn introspect(State(state): State<AppState>, body: String) -> Response {
    let mut claims = match body.strip_prefix("token=") {
        Some(token) => match state.token_helper().parse(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "introspected token did not verify");
                serde_json::Map::new()
            }
        },
        None => {
            tracing::warn!("introspection request without token parameter");
            serde_json::Map::new()
        }
    };

    let now = chrono::Utc::now().timestamp();
    let active = claims
        .get("exp")
        .and_then(Value::as_i64)
        .is_some_and(|expiry| now < expiry);
    claims.insert("active".to_string(), Value::Bool(active));

    Json(claims).into_response()
}

/// Serves the JWKS document.
pub async fn certs(State(state): State<AppState>) -> Json<JsonWebKeySet> {
    Json(state.key_set().clone())
}

/// Serves the OpenID configuration discovery document.
pub async fn well_known(
    State(state): State<AppState>,
    Path(realm): Path<String>,
    headers: HeaderMap,
) -> Json<ProviderMetadata> {
    let urls = state.request_urls(&headers, &realm);
    Json(ProviderMetadata::for_urls(&urls))
}

/// Serves the logout endpoint.
///
/// The session named by the cookie is removed and the cookie invalidated;
/// removal of an unknown session is a no-op.
pub async fn logout(
    State(state): State<AppState>,
    Path(realm): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<LogoutQuery>,
) -> Response {
    let urls = state.request_urls(&headers, &realm);

    if let Some(session_id) = jar
        .get(KEYCLOAK_SESSION_COOKIE)
        .and_then(|cookie| cookie.value().rsplit('/').next())
    {
        state.repository().remove_session(session_id);
    }

    let jar = jar.add(state.redirect().invalidate_cookie(&urls));
    match query.redirect_uri {
        Some(redirect_uri) => {
            (StatusCode::FOUND, jar, [(header::LOCATION, redirect_uri)]).into_response()
        }
        None => (StatusCode::FOUND, jar).into_response(),
    }
}

/// Credentials from a `Basic` authorization header, if one is present and
/// decodes.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, Option<String>)> {
    let authorization = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = authorization.strip_prefix("Basic ")?;
    let decoded = match STANDARD
        .decode(encoded)
        .map_err(|e| e.to_string())
        .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()))
    {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!(error = %e, "unable to parse authorization header");
            return None;
        }
    };
    match decoded.split_once(':') {
        Some((username, password)) => Some((username.to_string(), Some(password.to_string()))),
        None => Some((decoded, None)),
    }
}
