//! Implicit and hybrid flow tests.
//!
//! Checks fragment placement of tokens, response-mode overrides, and the
//! degenerate `none` response type.

use serde_json::json;

use crate::harness::{
    TEST_CLIENT_ID, TEST_REALM, TEST_REDIRECT_URI, TestHarness, auth_path_with, body_string,
    fetch_jwks, form_action, login, params_after, url_path, verify_token,
};

fn auth_uri(response_type: &str, extra: &[(&str, &str)]) -> String {
    let mut params = vec![
        ("client_id", TEST_CLIENT_ID),
        ("redirect_uri", TEST_REDIRECT_URI),
        ("response_type", response_type),
    ];
    params.extend_from_slice(extra);
    auth_path_with(TEST_REALM, &params)
}

#[tokio::test]
async fn id_token_flow_places_the_token_in_the_fragment() {
    let harness = TestHarness::new();
    let uri = auth_uri("id_token", &[("state", "implicit-state")]);

    let login = login(&harness, &uri, "jane.doe", "").await;

    let prefix = format!(
        "{TEST_REDIRECT_URI}#state=implicit-state&session_state={}&id_token=",
        login.session_id
    );
    assert!(
        login.location.starts_with(&prefix),
        "unexpected redirect: {}",
        login.location
    );

    let fragment = params_after(&login.location, '#');
    let jwks = fetch_jwks(&harness).await;
    let claims = verify_token(&fragment["id_token"], &jwks);
    assert_eq!(claims["sub"], json!("jane.doe"));
    assert_eq!(claims["azp"], json!(TEST_CLIENT_ID));
}

#[tokio::test]
async fn query_mode_override_is_ignored_for_id_token() {
    let harness = TestHarness::new();
    let uri = auth_uri("id_token", &[("response_mode", "query")]);

    let login = login(&harness, &uri, "jane", "").await;

    assert!(
        login.location.contains('#'),
        "id_token must stay in the fragment: {}",
        login.location
    );
    assert!(!login.location.contains('?'));
}

#[tokio::test]
async fn hybrid_token_response_carries_both_tokens() {
    let harness = TestHarness::new();
    let uri = auth_uri("token id_token", &[("state", "s1")]);

    let login = login(&harness, &uri, "john_doe", "admin").await;

    assert!(
        login.location.ends_with("&token_type=bearer"),
        "unexpected redirect: {}",
        login.location
    );
    let fragment = params_after(&login.location, '#');
    assert_eq!(fragment["state"], "s1");
    assert_eq!(fragment["session_state"], login.session_id);
    assert_eq!(fragment["id_token"], fragment["access_token"]);

    let jwks = fetch_jwks(&harness).await;
    let claims = verify_token(&fragment["access_token"], &jwks);
    assert_eq!(claims["sub"], json!("john_doe"));
}

#[tokio::test]
async fn code_flow_honors_a_fragment_override() {
    let harness = TestHarness::new();
    let uri = auth_uri("code", &[("response_mode", "fragment")]);

    let login = login(&harness, &uri, "jane", "").await;

    assert_eq!(
        login.location,
        format!(
            "{TEST_REDIRECT_URI}#session_state={}&code={}",
            login.session_id, login.session_id
        )
    );
}

#[tokio::test]
async fn unknown_response_mode_falls_back_to_the_type_default() {
    let harness = TestHarness::new();
    let uri = auth_uri("code", &[("response_mode", "banana")]);

    let login = login(&harness, &uri, "jane", "").await;

    assert!(
        login.location.contains("?session_state="),
        "code should fall back to query placement: {}",
        login.location
    );
}

#[tokio::test]
async fn none_flow_sends_no_credentials() {
    let harness = TestHarness::new();
    let uri = auth_uri("none", &[("state", "none-state")]);

    let login = login(&harness, &uri, "jane", "").await;

    assert_eq!(
        login.location,
        format!(
            "{TEST_REDIRECT_URI}?state=none-state&session_state={}",
            login.session_id
        )
    );
}

#[tokio::test]
async fn unknown_response_type_fails_the_login() {
    let harness = TestHarness::new();
    let uri = auth_uri("garbage", &[]);

    let response = harness.get(&uri).await;
    assert_eq!(response.status(), 200, "login page still renders");
    let html = body_string(response).await;
    let action = form_action(&html);

    let response = harness.post_form(&url_path(&action), "username=jane").await;

    assert_eq!(response.status(), 400);
}
