//! Session models for the login flows.

use uuid::Uuid;

use crate::user_data::UserData;

/// A login session a token can be issued for.
pub trait LoginSession: Send + Sync {
    /// Session ID, doubling as the authorization code.
    fn session_id(&self) -> &str;

    /// Client the session belongs to.
    fn client_id(&self) -> &str;

    /// Identity of the logged-in user.
    fn user(&self) -> &UserData;

    /// Roles granted at login.
    fn roles(&self) -> &[String];

    /// Nonce from the authorization request, if any.
    fn nonce(&self) -> Option<&str>;
}

/// Parameters for building a [`SessionRequest`].
#[derive(Debug, Clone, Default)]
pub struct SessionRequestOptions {
    /// Session ID to store the request under. Generated when absent.
    pub session_id: Option<String>,
    /// Client that initiated the authorization request.
    pub client_id: String,
    /// Redirect URI to send the user back to.
    pub redirect_uri: String,
    /// Requested response type, e.g. `code`.
    pub response_type: String,
    /// Requested response mode override, if any.
    pub response_mode: Option<String>,
    /// Opaque state echoed back in the redirect.
    pub state: Option<String>,
    /// Nonce to embed in issued tokens.
    pub nonce: Option<String>,
}

/// An authorization request waiting for the user to authenticate.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    session_id: String,
    client_id: String,
    redirect_uri: String,
    response_type: String,
    response_mode: Option<String>,
    state: Option<String>,
    nonce: Option<String>,
}

impl SessionRequest {
    /// Captures an authorization request.
    #[must_use]
    pub fn new(options: SessionRequestOptions) -> Self {
        Self {
            session_id: options
                .session_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            client_id: options.client_id,
            redirect_uri: options.redirect_uri,
            response_type: options.response_type,
            response_mode: options.response_mode,
            state: options.state,
            nonce: options.nonce,
        }
    }

    /// Session ID the request is stored under.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Client that initiated the request.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

/// An established login session with the user identity attached.
#[derive(Debug, Clone)]
pub struct PersistentSession {
    session_id: String,
    client_id: String,
    redirect_uri: String,
    response_type: String,
    response_mode: Option<String>,
    state: Option<String>,
    nonce: Option<String>,
    user: UserData,
    roles: Vec<String>,
}

impl PersistentSession {
    /// Completes a login request once the user has authenticated.
    #[must_use]
    pub fn from_request(request: &SessionRequest, user: UserData, roles: Vec<String>) -> Self {
        Self {
            session_id: request.session_id.clone(),
            client_id: request.client_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            response_type: request.response_type.clone(),
            response_mode: request.response_mode.clone(),
            state: request.state.clone(),
            nonce: request.nonce.clone(),
            user,
            roles,
        }
    }

    /// Redirect URI the user is sent back to.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Response type requested at login.
    #[must_use]
    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    /// Response mode override requested at login, if any.
    #[must_use]
    pub fn response_mode(&self) -> Option<&str> {
        self.response_mode.as_deref()
    }

    /// State parameter of the authorization request, if any.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }
}

impl LoginSession for PersistentSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn user(&self) -> &UserData {
        &self.user
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }

    fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }
}

/// A synthetic session for direct grants, never stored in the repository.
#[derive(Debug, Clone)]
pub struct AdHocSession {
    session_id: String,
    client_id: String,
    user: UserData,
    roles: Vec<String>,
}

impl AdHocSession {
    /// Builds a session for a direct grant.
    ///
    /// The password is not checked; it is interpreted as a comma separated
    /// role list.
    #[must_use]
    pub fn from_credentials(
        client_id: &str,
        hostname: &str,
        username: &str,
        password: Option<&str>,
    ) -> Self {
        let roles = password
            .map(|value| value.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            session_id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            user: UserData::from_username_and_hostname(username, hostname),
            roles,
        }
    }
}

impl LoginSession for AdHocSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn user(&self) -> &UserData {
        &self.user
    }

    fn roles(&self) -> &[String] {
        &self.roles
    }

    fn nonce(&self) -> Option<&str> {
        None
    }
}
