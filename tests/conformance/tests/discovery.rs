//! Discovery document and JWKS tests.

use axum::{
    body::Body,
    http::{Request, header},
};
use serde_json::json;

use kcmock_core::ServerConfig;

use crate::harness::{TEST_REALM, TestHarness, body_json, certs_path, well_known_path};

#[tokio::test]
async fn discovery_document_lists_the_realm_endpoints() {
    let harness = TestHarness::new();

    let response = harness.get(&well_known_path(TEST_REALM)).await;

    assert_eq!(response.status(), 200);
    let issuer = "http://localhost:8000/auth/realms/master";
    assert_eq!(
        body_json(response).await,
        json!({
            "issuer": issuer,
            "authorization_endpoint": format!("{issuer}/protocol/openid-connect/auth"),
            "token_endpoint": format!("{issuer}/protocol/openid-connect/token"),
            "introspection_endpoint": format!("{issuer}/protocol/openid-connect/token/introspect"),
            "jwks_uri": format!("{issuer}/protocol/openid-connect/certs"),
            "end_session_endpoint": format!("{issuer}/protocol/openid-connect/logout"),
            "response_types_supported": ["code", "code id_token", "id_token", "token id_token"],
            "subject_types_supported": ["public"],
            "id_token_signing_alg_values_supported": ["RS256"],
        })
    );
}

#[tokio::test]
async fn discovery_document_follows_the_request_context() {
    let harness = TestHarness::new();
    let request = Request::builder()
        .uri(well_known_path("tenant"))
        .header(header::HOST, "id.example.com:8443")
        .body(Body::empty())
        .expect("request builds");

    let response = harness.send(request).await;

    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(
        body["issuer"],
        json!("http://id.example.com:8443/auth/realms/tenant")
    );
    assert_eq!(
        body["token_endpoint"],
        json!("http://id.example.com:8443/auth/realms/tenant/protocol/openid-connect/token")
    );
}

#[tokio::test]
async fn jwks_document_exports_one_rsa_signing_key() {
    let harness = TestHarness::new();

    let response = harness.get(&certs_path(TEST_REALM)).await;

    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    let keys = body["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    let key = &keys[0];
    assert!(!key["kid"].as_str().unwrap().is_empty());
    assert_eq!(key["use"], json!("sig"));
    assert_eq!(key["alg"], json!("RS256"));
    assert_eq!(key["kty"], json!("RSA"));
    assert!(key["n"].is_string());
    assert_eq!(key["e"], json!("AQAB"));
    assert!(key.get("crv").is_none(), "RSA keys carry no curve fields");
}

#[tokio::test]
async fn a_stripped_context_path_moves_the_routes() {
    let config = ServerConfig {
        context_path: String::new(),
        ..ServerConfig::default()
    };
    let harness = TestHarness::with_config(config);

    let response = harness
        .get("/realms/master/.well-known/openid-configuration")
        .await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["issuer"], json!("http://localhost:8000/realms/master"));

    let response = harness.get(&well_known_path(TEST_REALM)).await;
    assert_eq!(response.status(), 404, "the default prefix is gone");
}
