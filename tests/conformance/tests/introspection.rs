//! Token introspection tests.
//!
//! Introspection never fails a request over a bad token; the response
//! degrades to `{"active": false}` as RFC 7662 asks.

use serde_json::json;

use kcmock_core::ServerConfig;

use crate::harness::{TEST_REALM, TestHarness, body_json, introspect_path, token_path};

async fn issue_password_grant_token(harness: &TestHarness) -> String {
    let response = harness
        .post_form(
            &token_path(TEST_REALM),
            "grant_type=password&client_id=cli&username=alice&password=r1",
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn a_freshly_issued_token_is_active() {
    let harness = TestHarness::new();
    let token = issue_password_grant_token(&harness).await;

    let response = harness
        .post_form(&introspect_path(TEST_REALM), &format!("token={token}"))
        .await;

    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["active"], json!(true));
    assert_eq!(body["sub"], json!("alice"));
    assert_eq!(body["azp"], json!("cli"));
    assert_eq!(body["iss"], json!("http://localhost:8000/auth/realms/master"));
}

#[tokio::test]
async fn an_expired_token_is_inactive_but_still_echoed() {
    let config = ServerConfig {
        default_token_lifespan_secs: 0,
        ..ServerConfig::default()
    };
    let harness = TestHarness::with_config(config);
    let token = issue_password_grant_token(&harness).await;

    let response = harness
        .post_form(&introspect_path(TEST_REALM), &format!("token={token}"))
        .await;

    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["active"], json!(false));
    assert_eq!(body["sub"], json!("alice"));
}

#[tokio::test]
async fn a_garbage_token_is_inactive() {
    let harness = TestHarness::new();

    let response = harness
        .post_form(&introspect_path(TEST_REALM), "token=garbage")
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(body_json(response).await, json!({ "active": false }));
}

#[tokio::test]
async fn a_request_without_a_token_is_inactive() {
    let harness = TestHarness::new();

    let response = harness
        .post_form(&introspect_path(TEST_REALM), "nottoken=x")
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(body_json(response).await, json!({ "active": false }));
}
