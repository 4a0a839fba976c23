//! Login UI handlers.
//!
//! This module provides the HTML side of the authorization flow: the login
//! page shown by the authorization endpoint, the callback its form posts
//! back to, and the out-of-band page displaying an authorization code.

use std::sync::Arc;

use askama::Template;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use kcmock_protocol_oidc::{KEYCLOAK_SESSION_COOKIE, UrlConfiguration};
use kcmock_session::{
    LoginSession, PersistentSession, SessionRequest, SessionRequestOptions, SessionResult, UserData,
};

use crate::state::AppState;

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    /// Realm the user signs in to.
    pub realm: String,
    /// Client that requested the login.
    pub client_id: String,
    /// URL the login form posts to.
    pub authentication_uri: String,
}

/// Out-of-band page template.
#[derive(Template)]
#[template(path = "oob.html")]
pub struct OutOfBandTemplate {
    /// Authorization code to display.
    pub code: String,
}

/// Query parameters of the authorization endpoint.
///
/// `client_id` and `redirect_uri` are mandatory; requests without them are
/// rejected before the handler runs.
#[derive(Debug, Deserialize)]
pub struct AuthorizationQuery {
    /// OAuth client ID.
    pub client_id: String,
    /// Redirect URI to send the user back to.
    pub redirect_uri: String,
    /// Response type, `code` when not given.
    #[serde(default = "default_response_type")]
    pub response_type: String,
    /// Response mode override.
    pub response_mode: Option<String>,
    /// Opaque state echoed back in the redirect.
    pub state: Option<String>,
    /// Nonce embedded in issued tokens.
    pub nonce: Option<String>,
}

fn default_response_type() -> String {
    "code".to_string()
}

/// Form data of the login page.
#[derive(Debug, Deserialize)]
pub struct AuthenticationForm {
    /// Submitted username.
    pub username: Option<String>,
    /// Password field, interpreted as a comma separated role list.
    pub password: Option<String>,
}

/// Query parameters of the out-of-band page.
#[derive(Debug, Deserialize)]
pub struct OutOfBandQuery {
    /// Authorization code, i.e. the session ID.
    pub code: Option<String>,
}

/// Serves the authorization endpoint.
///
/// A browser arriving with a session cookie that resolves to an established
/// session is logged in again immediately with the stored identity; only the
/// parameters of the new authorization request replace the old ones.
/// Everyone else gets the login page for a freshly stored login request.
pub async fn login_page(
    State(state): State<AppState>,
    Path(realm): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<AuthorizationQuery>,
) -> Response {
    let urls = state.request_urls(&headers, &realm);

    let existing = jar
        .get(KEYCLOAK_SESSION_COOKIE)
        .and_then(|cookie| cookie.value().rsplit('/').next())
        .and_then(|session_id| state.repository().get_session(session_id));

    if let Some(existing) = existing {
        match renew_session(&state, &existing, &query) {
            Ok(session) => return redirect_response(&state, &session, &urls),
            Err(e) => {
                tracing::warn!(
                    session_id = existing.session_id(),
                    error = %e,
                    "session changed concurrently, starting fresh login"
                );
            }
        }
    }

    let request = Arc::new(SessionRequest::new(SessionRequestOptions {
        session_id: None,
        client_id: query.client_id,
        redirect_uri: query.redirect_uri,
        response_type: query.response_type,
        response_mode: query.response_mode,
        state: query.state,
        nonce: query.nonce,
    }));
    if let Err(e) = state.repository().put_request(request.clone()) {
        tracing::warn!(
            session_id = request.session_id(),
            error = %e,
            "unable to store login request"
        );
        return (StatusCode::CONFLICT, "Session already exists").into_response();
    }

    let template = LoginTemplate {
        realm: urls.realm().to_string(),
        client_id: request.client_id().to_string(),
        authentication_uri: urls.authentication_callback_endpoint(request.session_id()),
    };
    render(&template)
}

/// Handles the login form submission.
///
/// No credential is checked; the submitted username becomes the identity and
/// the password field is read as a comma separated role list.
pub async fn authenticate(
    State(state): State<AppState>,
    Path((realm, session_id)): Path<(String, String)>,
    headers: HeaderMap,
    Form(form): Form<AuthenticationForm>,
) -> Response {
    let urls = state.request_urls(&headers, &realm);

    let Some(request) = state.repository().get_request(&session_id) else {
        tracing::warn!(%session_id, "login for unknown session requested");
        return (StatusCode::NOT_FOUND, "Unknown session").into_response();
    };
    let Some(username) = form.username else {
        tracing::warn!(%session_id, "login form without username submitted");
        return (StatusCode::BAD_REQUEST, "Username is required").into_response();
    };
    let roles: Vec<String> = form
        .password
        .as_deref()
        .map(|value| value.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    let user = UserData::from_username_and_hostname(&username, urls.hostname());
    let session = Arc::new(PersistentSession::from_request(&request, user, roles));
    if let Err(e) = state.repository().upgrade_request(&request, session.clone()) {
        tracing::warn!(%session_id, error = %e, "session was authenticated concurrently");
        return (StatusCode::CONFLICT, "Session already authenticated").into_response();
    }

    redirect_response(&state, &session, &urls)
}

/// Serves the out-of-band page displaying the authorization code.
pub async fn out_of_band_page(Query(query): Query<OutOfBandQuery>) -> Response {
    let template = OutOfBandTemplate {
        code: query.code.unwrap_or_else(|| "invalid".to_string()),
    };
    render(&template)
}

/// Builds a new established session from the stored identity of `existing`
/// and the parameters of the new authorization request, keeping the session
/// ID stable.
fn renew_session(
    state: &AppState,
    existing: &Arc<PersistentSession>,
    query: &AuthorizationQuery,
) -> SessionResult<Arc<PersistentSession>> {
    let request = SessionRequest::new(SessionRequestOptions {
        session_id: Some(existing.session_id().to_string()),
        client_id: query.client_id.clone(),
        redirect_uri: query.redirect_uri.clone(),
        response_type: query.response_type.clone(),
        response_mode: query.response_mode.clone(),
        state: query.state.clone(),
        nonce: query.nonce.clone(),
    });
    let session = Arc::new(PersistentSession::from_request(
        &request,
        existing.user().clone(),
        existing.roles().to_vec(),
    ));
    state.repository().update_session(existing, session.clone())?;
    Ok(session)
}

/// Responds with the 302 completing a login: redirect location per the
/// session's response type plus the refreshed session cookie.
fn redirect_response(
    state: &AppState,
    session: &PersistentSession,
    urls: &UrlConfiguration,
) -> Response {
    let Some(location) = state.redirect().redirect_location(session, urls) else {
        return (StatusCode::BAD_REQUEST, "Invalid response type").into_response();
    };
    let cookie = state.redirect().session_cookie(session, urls);
    (
        StatusCode::FOUND,
        [
            (header::SET_COOKIE, cookie.to_string()),
            (header::LOCATION, location),
        ],
    )
        .into_response()
}

fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}
