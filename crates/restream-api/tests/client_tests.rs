//! Behavior tests for the authenticated API client.

use std::time::Duration;

use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use restream_api::{ApiClient, ApiError, TokenPair, TokenStore};
use restream_types::DeviceInfo;

fn seeded_store(dir: &tempfile::TempDir) -> (TokenStore, TokenPair) {
    let store = TokenStore::new(dir.path().join("tokens.json"));
    let pair = TokenPair {
        access_token: "old-token".to_string(),
        refresh_token: "old-refresh".to_string(),
    };
    store.save(&pair).unwrap();
    (store, pair)
}

fn client(server: &MockServer, dir: &tempfile::TempDir) -> ApiClient {
    let (store, pair) = seeded_store(dir);
    ApiClient::new(server.uri(), store, pair, DeviceInfo::default()).unwrap()
}

fn refresh_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "data": {
            "access_token": "new-token",
            "refresh_token": "new-refresh",
        }
    }))
}

#[tokio::test]
async fn attaches_bearer_and_returns_json() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/core/v4/events/last-event/"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": {"required_packages": [1]}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, &dir);
    let last = client.last_event().await.unwrap();
    assert_eq!(last.required_packages.len(), 1);
}

#[tokio::test]
async fn refreshes_once_and_retries_transparently() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/thing"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thing"))
        .and(header("authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": true}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token/refresh/"))
        .and(body_partial_json(json!({"refresh_token": "old-refresh"})))
        .respond_with(refresh_response())
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, &dir);
    let value = client.request(Method::GET, "/thing", None).await.unwrap();
    assert_eq!(value.pointer("/data/ok"), Some(&json!(true)));

    // The refreshed pair was persisted atomically.
    let reloaded = TokenStore::new(dir.path().join("tokens.json")).load().unwrap();
    assert_eq!(reloaded.access_token, "new-token");
    assert_eq!(reloaded.refresh_token, "new-refresh");
}

#[tokio::test]
async fn second_rejection_after_refresh_is_fatal() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/thing"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token/refresh/"))
        .respond_with(refresh_response())
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, &dir);
    let err = client.request(Method::GET, "/thing", None).await.unwrap_err();
    assert!(matches!(err, ApiError::AuthExpired));
}

#[tokio::test]
async fn refresh_failure_is_reported() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/thing"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token/refresh/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("nope"))
        .mount(&server)
        .await;

    let client = client(&server, &dir);
    let err = client.request(Method::GET, "/thing", None).await.unwrap_err();
    assert!(matches!(err, ApiError::RefreshFailed(_)));
}

#[tokio::test]
async fn non_success_status_carries_body() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/core/v4/events/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client(&server, &dir);
    let err = client
        .request(Method::POST, "/core/v4/events/", Some(json!({})))
        .await
        .unwrap_err();
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn configured_deadline_is_enforced() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {}}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let (store, pair) = seeded_store(&dir);
    let client = ApiClient::with_timeout(
        server.uri(),
        store,
        pair,
        DeviceInfo::default(),
        Duration::from_millis(100),
    )
    .unwrap();

    let err = client.request(Method::GET, "/slow", None).await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout));
}

#[tokio::test]
async fn concurrent_expiries_share_one_refresh() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/thing"))
        .and(header("authorization", "Bearer old-token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thing"))
        .and(header("authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(5)
        .mount(&server)
        .await;
    // A single refresh must serve every concurrent caller.
    Mock::given(method("POST"))
        .and(path("/auth/v1/token/refresh/"))
        .respond_with(refresh_response().set_delay(Duration::from_millis(50)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, &dir);
    let (a, b, c, d, e) = tokio::join!(
        client.request(Method::GET, "/thing", None),
        client.request(Method::GET, "/thing", None),
        client.request(Method::GET, "/thing", None),
        client.request(Method::GET, "/thing", None),
        client.request(Method::GET, "/thing", None),
    );
    for result in [a, b, c, d, e] {
        assert!(result.is_ok());
    }
}
