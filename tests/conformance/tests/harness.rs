//! Test harness driving the mock server in process.
//!
//! Requests go straight into the router via `tower::ServiceExt::oneshot`;
//! no port is bound and no network involved.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, Response, header};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde_json::Value;
use tower::ServiceExt;

use kcmock_core::ServerConfig;
use kcmock_crypto::KeyPair;
use kcmock_server::{AppState, create_router};

/// Standard test realm name; matches the configured default realm.
pub const TEST_REALM: &str = "master";

/// Standard test client ID.
pub const TEST_CLIENT_ID: &str = "test-client";

/// Standard callback URI of the test client.
pub const TEST_REDIRECT_URI: &str = "http://localhost:8080/callback";

/// Test harness around one router instance.
///
/// The router is cloneable, so a single harness can serve any number of
/// requests against the same session repository.
pub struct TestHarness {
    router: Router,
}

impl TestHarness {
    /// Creates a harness with the default configuration and signing key.
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Creates a harness with a custom configuration.
    pub fn with_config(config: ServerConfig) -> Self {
        let key_pair = KeyPair::default_rsa().expect("embedded key pair loads");
        let state = AppState::new(config, Arc::new(key_pair));
        Self {
            router: create_router(state),
        }
    }

    /// Sends one request into the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Sends a GET request.
    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builds");
        self.send(request).await
    }

    /// Sends a GET request with a `Cookie` header.
    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("request builds");
        self.send(request).await
    }

    /// Sends a form-encoded POST request.
    pub async fn post_form(&self, uri: &str, body: &str) -> Response<Body> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("request builds");
        self.send(request).await
    }
}

/// Authorization endpoint path of a realm.
pub fn auth_path(realm: &str) -> String {
    format!("/auth/realms/{realm}/protocol/openid-connect/auth")
}

/// Authorization endpoint path with URL-encoded query parameters.
pub fn auth_path_with(realm: &str, params: &[(&str, &str)]) -> String {
    let query: Vec<String> = params
        .iter()
        .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
        .collect();
    format!("{}?{}", auth_path(realm), query.join("&"))
}

/// Token endpoint path of a realm.
pub fn token_path(realm: &str) -> String {
    format!("/auth/realms/{realm}/protocol/openid-connect/token")
}

/// Introspection endpoint path of a realm.
pub fn introspect_path(realm: &str) -> String {
    format!("/auth/realms/{realm}/protocol/openid-connect/token/introspect")
}

/// JWKS endpoint path of a realm.
pub fn certs_path(realm: &str) -> String {
    format!("/auth/realms/{realm}/protocol/openid-connect/certs")
}

/// Logout endpoint path of a realm.
pub fn logout_path(realm: &str) -> String {
    format!("/auth/realms/{realm}/protocol/openid-connect/logout")
}

/// Discovery document path of a realm.
pub fn well_known_path(realm: &str) -> String {
    format!("/auth/realms/{realm}/.well-known/openid-configuration")
}

/// Reads a response body to its end.
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    String::from_utf8(bytes.to_vec()).expect("body is UTF-8")
}

/// Reads a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let body = body_string(response).await;
    serde_json::from_str(&body).expect("body is JSON")
}

/// `Location` header of a redirect response.
pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Location header present")
        .to_str()
        .expect("Location header is a string")
        .to_string()
}

/// Full `Set-Cookie` header of a response.
pub fn set_cookie(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header present")
        .to_str()
        .expect("Set-Cookie header is a string")
        .to_string()
}

/// The `name=value` part of a response's `Set-Cookie` header, suitable for
/// sending back as a `Cookie` header.
pub fn cookie_pair(response: &Response<Body>) -> String {
    let raw = set_cookie(response);
    raw.split(';').next().unwrap_or_default().to_string()
}

/// The `action` attribute of the first form in an HTML page.
pub fn form_action(html: &str) -> String {
    let start = html.find("action=\"").expect("form action present") + "action=\"".len();
    let end = html[start..].find('"').expect("action closes") + start;
    html[start..end].to_string()
}

/// Path-and-query of an absolute URL.
pub fn url_path(url: &str) -> String {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    match after_scheme.find('/') {
        Some(index) => after_scheme[index..].to_string(),
        None => "/".to_string(),
    }
}

/// Parameters of a redirect location, taken from the given separator on.
pub fn params_after(location: &str, separator: char) -> HashMap<String, String> {
    let Some((_, raw)) = location.split_once(separator) else {
        return HashMap::new();
    };
    raw.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

/// A completed browser login.
pub struct Login {
    /// Session ID, doubling as the authorization code.
    pub session_id: String,
    /// Redirect location the login ended on.
    pub location: String,
    /// Session cookie as a `name=value` pair.
    pub cookie: String,
}

/// Drives a full browser login: authorization request, login page, form
/// submission.
pub async fn login(
    harness: &TestHarness,
    auth_uri: &str,
    username: &str,
    roles: &str,
) -> Login {
    let response = harness.get(auth_uri).await;
    assert_eq!(
        response.status(),
        200,
        "authorization endpoint should render the login page"
    );
    let html = body_string(response).await;
    let action = form_action(&html);
    let session_id = action
        .rsplit('/')
        .next()
        .expect("action URL has a session segment")
        .to_string();

    let form = format!(
        "username={}&password={}",
        urlencoding::encode(username),
        urlencoding::encode(roles)
    );
    let response = harness.post_form(&url_path(&action), &form).await;
    assert_eq!(response.status(), 302, "login form should redirect");

    Login {
        session_id,
        location: location(&response),
        cookie: cookie_pair(&response),
    }
}

/// Fetches the JWKS document of the test realm.
pub async fn fetch_jwks(harness: &TestHarness) -> Value {
    let response = harness.get(&certs_path(TEST_REALM)).await;
    assert_eq!(response.status(), 200);
    body_json(response).await
}

/// Verifies a token's signature against an RSA JWKS entry and returns its
/// claims.
pub fn verify_token(token: &str, jwks: &Value) -> serde_json::Map<String, Value> {
    let key = &jwks["keys"][0];
    let modulus = key["n"].as_str().expect("key has a modulus");
    let exponent = key["e"].as_str().expect("key has an exponent");
    let decoding_key =
        DecodingKey::from_rsa_components(modulus, exponent).expect("JWK components load");

    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = std::collections::HashSet::new();

    decode::<serde_json::Map<String, Value>>(token, &decoding_key, &validation)
        .expect("token verifies against the JWKS")
        .claims
}
