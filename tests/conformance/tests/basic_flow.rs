//! Authorization code flow tests.
//!
//! Drives the full browser flow: authorization request, login page, form
//! submission, code-for-token exchange, and session continuity across a
//! second login.

use serde_json::json;

use crate::harness::{
    TEST_CLIENT_ID, TEST_REALM, TEST_REDIRECT_URI, TestHarness, auth_path, auth_path_with,
    body_json, body_string, fetch_jwks, form_action, location, login, set_cookie, token_path,
    verify_token,
};

#[tokio::test]
async fn authorization_code_flow_end_to_end() {
    let harness = TestHarness::new();
    let auth_uri = auth_path_with(
        TEST_REALM,
        &[
            ("client_id", TEST_CLIENT_ID),
            ("redirect_uri", TEST_REDIRECT_URI),
            ("response_type", "code"),
            ("state", "state-123"),
            ("nonce", "nonce-456"),
        ],
    );

    let login = login(&harness, &auth_uri, "jane.doe", "role1,role2").await;

    assert_eq!(
        login.location,
        format!(
            "{TEST_REDIRECT_URI}?state=state-123&session_state={}&code={}",
            login.session_id, login.session_id
        )
    );
    assert_eq!(
        login.cookie,
        format!("KEYCLOAK_SESSION=master/dummy-user-id/{}", login.session_id)
    );

    let form = format!("grant_type=authorization_code&code={}", login.session_id);
    let response = harness.post_form(&token_path(TEST_REALM), &form).await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;

    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 36_000);
    assert_eq!(body["refresh_expires_in"], 36_000);
    assert_eq!(body["session_state"], json!(login.session_id));
    assert_eq!(body["access_token"], body["id_token"]);
    assert_eq!(body["access_token"], body["refresh_token"]);

    let jwks = fetch_jwks(&harness).await;
    let token = body["access_token"].as_str().unwrap();
    let claims = verify_token(token, &jwks);

    assert_eq!(
        claims["iss"],
        json!("http://localhost:8000/auth/realms/master")
    );
    assert_eq!(claims["sub"], json!("jane.doe"));
    assert_eq!(claims["aud"], json!(["server", "test-client"]));
    assert_eq!(claims["azp"], json!(TEST_CLIENT_ID));
    assert_eq!(claims["typ"], json!("Bearer"));
    assert_eq!(claims["scope"], json!("openid"));
    assert_eq!(claims["nonce"], json!("nonce-456"));
    assert_eq!(claims["acr"], json!("1"));
    assert_eq!(claims["preferred_username"], json!("jane.doe"));
    assert_eq!(claims["given_name"], json!("Jane"));
    assert_eq!(claims["family_name"], json!("Doe"));
    assert_eq!(claims["name"], json!("Jane Doe"));
    assert_eq!(claims["email"], json!("jane.doe@localhost:8000"));
    assert_eq!(claims["realm_access"]["roles"], json!(["role1", "role2"]));

    let issued_at = claims["iat"].as_i64().unwrap();
    let expiry = claims["exp"].as_i64().unwrap();
    assert_eq!(expiry - issued_at, 36_000);
}

#[tokio::test]
async fn second_login_reuses_the_session() {
    let harness = TestHarness::new();
    let auth_uri = auth_path_with(
        TEST_REALM,
        &[
            ("client_id", TEST_CLIENT_ID),
            ("redirect_uri", TEST_REDIRECT_URI),
            ("response_type", "code"),
        ],
    );
    let first = login(&harness, &auth_uri, "john", "admin").await;

    // A browser carrying the session cookie skips the login page.
    let second_uri = auth_path_with(
        TEST_REALM,
        &[
            ("client_id", "other-client"),
            ("redirect_uri", TEST_REDIRECT_URI),
            ("response_type", "code"),
            ("state", "second-state"),
        ],
    );
    let response = harness.get_with_cookie(&second_uri, &first.cookie).await;

    assert_eq!(response.status(), 302);
    assert_eq!(
        location(&response),
        format!(
            "{TEST_REDIRECT_URI}?state=second-state&session_state={}&code={}",
            first.session_id, first.session_id
        )
    );
    assert!(set_cookie(&response).contains(&first.session_id));

    // The replaced session carries the stored identity and the new client.
    let form = format!("grant_type=authorization_code&code={}", first.session_id);
    let response = harness.post_form(&token_path(TEST_REALM), &form).await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    let jwks = fetch_jwks(&harness).await;
    let claims = verify_token(body["access_token"].as_str().unwrap(), &jwks);

    assert_eq!(claims["sub"], json!("john"));
    assert_eq!(claims["azp"], json!("other-client"));
    assert_eq!(claims["realm_access"]["roles"], json!(["admin"]));
}

#[tokio::test]
async fn stale_cookie_falls_back_to_the_login_page() {
    let harness = TestHarness::new();
    let auth_uri = auth_path_with(
        TEST_REALM,
        &[
            ("client_id", TEST_CLIENT_ID),
            ("redirect_uri", TEST_REDIRECT_URI),
            ("response_type", "code"),
        ],
    );

    let cookie = "KEYCLOAK_SESSION=master/dummy-user-id/never-stored";
    let response = harness.get_with_cookie(&auth_uri, cookie).await;

    assert_eq!(response.status(), 200);
    let html = body_string(response).await;
    assert!(html.contains("name=\"username\""));
}

#[tokio::test]
async fn authorization_request_requires_client_id_and_redirect_uri() {
    let harness = TestHarness::new();

    let response = harness
        .get(&format!("{}?client_id=abc", auth_path(TEST_REALM)))
        .await;
    assert_eq!(response.status(), 400);

    let response = harness
        .get(&format!(
            "{}?redirect_uri=http%3A%2F%2Flocalhost",
            auth_path(TEST_REALM)
        ))
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn login_form_requires_a_username() {
    let harness = TestHarness::new();
    let auth_uri = auth_path_with(
        TEST_REALM,
        &[
            ("client_id", TEST_CLIENT_ID),
            ("redirect_uri", TEST_REDIRECT_URI),
            ("response_type", "code"),
        ],
    );
    let response = harness.get(&auth_uri).await;
    let html = body_string(response).await;
    let action = form_action(&html);

    let response = harness
        .post_form(&crate::harness::url_path(&action), "password=role1")
        .await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn login_form_for_unknown_session_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .post_form(
            &format!(
                "/auth/realms/{TEST_REALM}/protocol/openid-connect/authenticate/no-such-session"
            ),
            "username=jane",
        )
        .await;

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn login_page_defaults_the_response_type_to_code() {
    let harness = TestHarness::new();
    let auth_uri = auth_path_with(
        TEST_REALM,
        &[
            ("client_id", TEST_CLIENT_ID),
            ("redirect_uri", TEST_REDIRECT_URI),
        ],
    );

    let login = login(&harness, &auth_uri, "jane", "").await;

    // Without a state parameter, session_state takes the leading separator.
    assert_eq!(
        login.location,
        format!(
            "{TEST_REDIRECT_URI}?session_state={}&code={}",
            login.session_id, login.session_id
        )
    );
}
