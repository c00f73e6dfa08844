use std::sync::Arc;
use std::time::Duration;

use identikit::auth::SessionStore;
use identikit::config::ApiConfig;
use identikit::error::ApiError;
use identikit::http::ApiClient;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> (Arc<SessionStore>, ApiClient) {
    let session = Arc::new(SessionStore::default());
    let client = ApiClient::new(ApiConfig::new(server.uri()), session.clone());
    (session, client)
}

#[tokio::test]
async fn bearer_token_is_attached_when_present() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "valid": true })))
        .expect(1)
        .mount(&server)
        .await;

    let (session, client) = client_for(&server);
    session.set_token("tok-123");

    let body: Value = client.get("/auth/session").await.unwrap();
    assert_eq!(body, json!({ "valid": true }));
}

#[tokio::test]
async fn default_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .and(header("user-agent", "identikit-rs/0.1"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "valid": false })))
        .expect(1)
        .mount(&server)
        .await;

    let (_session, client) = client_for(&server);
    let _: Value = client.get("/auth/session").await.unwrap();
}

#[tokio::test]
async fn unauthorized_clears_the_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "unauthorized",
            "message": "Session expired"
        })))
        .mount(&server)
        .await;

    let (session, client) = client_for(&server);
    session.set_token("tok-123");

    let err = client.get::<Value>("/auth/me").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert!(session.get_token().is_none());
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn structured_error_body_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "error": "validation_error",
            "message": "Bad request shape"
        })))
        .mount(&server)
        .await;

    let (_session, client) = client_for(&server);
    let err = client.get::<Value>("/auth/me").await.unwrap_err();
    match err {
        ApiError::Api {
            status,
            error,
            message,
        } => {
            assert_eq!(status, 422);
            assert_eq!(error.as_deref(), Some("validation_error"));
            assert_eq!(message, "Bad request shape");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_text_error_body_becomes_the_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(
            ResponseTemplate::new(503).set_body_string("upstream unavailable"),
        )
        .mount(&server)
        .await;

    let (_session, client) = client_for(&server);
    let err = client.get::<Value>("/auth/me").await.unwrap_err();
    match err {
        ApiError::Api {
            status, message, ..
        } => {
            assert_eq!(status, 503);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_text_success_body_deserializes_into_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("ok"),
        )
        .mount(&server)
        .await;

    let (_session, client) = client_for(&server);
    let body: String = client.get("/healthz").await.unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn slow_responses_hit_the_client_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "valid": true }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let session = Arc::new(SessionStore::default());
    let config = ApiConfig::new(server.uri()).with_timeout(Duration::from_millis(200));
    let client = ApiClient::new(config, session);

    let err = client.get::<Value>("/auth/session").await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout(200)));
}

#[tokio::test]
async fn post_sends_a_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/newgrounds/authenticate"))
        .and(wiremock::matchers::body_json(json!({ "session_id": "ng-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessionId": "tok-ng",
            "message": "ok"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_session, client) = client_for(&server);
    let body: Value = client
        .post("/auth/newgrounds/authenticate", &json!({ "session_id": "ng-1" }))
        .await
        .unwrap();
    assert_eq!(body["sessionId"], "tok-ng");
}
