//! Integration tests for API key management and key-based authentication.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum_extra::extract::cookie::SameSite;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use stash_api::{AppState, config::ApiConfig, router};
use stash_core::models::auth::{ApiKeyPermission, ApiKeyRecord};
use stash_core::store::MemoryStore;

const TEST_SECRET: &str = "integration-test-secret-0123456789ab";
const PASSWORD: &str = "a-strong-password";

fn test_state() -> AppState {
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        pg_connection_url: "postgres://unused".into(),
        jwt_secret: TEST_SECRET.into(),
        api_key_header: "X-API-Key".into(),
        cookie_same_site: SameSite::Strict,
        cookie_secure: true,
    };
    AppState::new(Arc::new(MemoryStore::new()), config)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value, HeaderMap) {
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON")
    };
    (status, body, headers)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Register an account and hand back its access token.
async fn register(app: &Router, username: &str) -> String {
    let (status, body, _) = send(
        app,
        post_json(
            "/auth/register",
            &json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {body}");
    body["accessToken"].as_str().expect("access token").into()
}

async fn create_key(app: &Router, bearer: &str, name: &str, permission: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/auth/api-keys")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "name": name, "permission": permission }).to_string(),
        ))
        .expect("request");
    let (status, body, _) = send(app, req).await;
    (status, body)
}

fn get_with_key(uri: &str, key: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("X-API-Key", key)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn plaintext_key_appears_exactly_once() {
    let state = test_state();
    let app = router(state);
    let bearer = register(&app, "root").await;

    let (status, created) = create_key(&app, &bearer, "deploy", "FULL_ACCESS").await;
    assert_eq!(status, StatusCode::OK, "{created}");

    let key = created["key"].as_str().expect("key value");
    assert_eq!(key.len(), 32);
    assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(created["permission"], "FULL_ACCESS");
    assert!(created["expiresAt"].is_string());

    // The list never repeats the value, only a recognizable tail.
    let req = Request::builder()
        .uri("/auth/api-keys")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::empty())
        .expect("request");
    let (status, listed, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let keys = listed["keys"].as_array().expect("keys array");
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["name"], "deploy");
    assert_eq!(keys[0]["isActive"], true);
    assert!(keys[0].get("key").is_none(), "plaintext leaked into list");
    let preview = keys[0]["keyPreview"].as_str().expect("preview");
    assert_eq!(preview, format!("****{}", &key[28..]));
}

#[tokio::test]
async fn full_access_key_authenticates_requests() {
    let state = test_state();
    let app = router(state);
    let bearer = register(&app, "root").await;

    let (_, created) = create_key(&app, &bearer, "automation", "FULL_ACCESS").await;
    let key = created["key"].as_str().expect("key value");

    let (status, body, _) = send(&app, get_with_key("/auth/api-keys", key)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn api_key_outranks_a_bearer_sent_alongside() {
    let state = test_state();
    let app = router(state);
    let bearer = register(&app, "root").await;

    let (_, created) = create_key(&app, &bearer, "reader", "READ_ONLY").await;
    let key = created["key"].as_str().expect("key value");

    // Bearer alone would pass. The key is judged first and its scope
    // cannot manage keys, so the request dies on 403.
    let req = Request::builder()
        .uri("/auth/api-keys")
        .header("X-API-Key", key)
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::empty())
        .expect("request");
    let (status, body, _) = send(&app, req).await;

    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
}

#[tokio::test]
async fn low_privilege_keys_cannot_manage_keys() {
    let state = test_state();
    let app = router(state);
    let bearer = register(&app, "root").await;

    let (_, created) = create_key(&app, &bearer, "reader", "READ_ONLY").await;
    let key = created["key"].as_str().expect("key value");
    let id = created["id"].as_str().expect("key id");

    let (status, body, _) = send(&app, get_with_key("/auth/api-keys", key)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/auth/api-keys/{id}"))
        .header("X-API-Key", key)
        .body(Body::empty())
        .expect("request");
    let (status, _, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bad_key_is_not_rescued_by_a_valid_bearer() {
    let state = test_state();
    let app = router(state);
    let bearer = register(&app, "root").await;

    let req = Request::builder()
        .uri("/auth/api-keys")
        .header("X-API-Key", "nosuchkeynosuchkeynosuchkey12345")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::empty())
        .expect("request");
    let (status, body, _) = send(&app, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED, "{body}");
}

#[tokio::test]
async fn revoked_key_stops_authenticating() {
    let state = test_state();
    let app = router(state);
    let bearer = register(&app, "root").await;

    let (_, created) = create_key(&app, &bearer, "doomed", "FULL_ACCESS").await;
    let key = created["key"].as_str().expect("key value");
    let id = created["id"].as_str().expect("key id");

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/auth/api-keys/{id}"))
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::empty())
        .expect("request");
    let (status, body, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _, _) = send(&app, get_with_key("/auth/api-keys", key)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Soft revocation: the record stays listed, flagged inactive.
    let req = Request::builder()
        .uri("/auth/api-keys")
        .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
        .body(Body::empty())
        .expect("request");
    let (_, listed, _) = send(&app, req).await;
    assert_eq!(listed["keys"][0]["isActive"], false);
}

#[tokio::test]
async fn expired_key_is_rejected() {
    let state = test_state();
    let store = state.store.clone();
    let app = router(state);
    register(&app, "root").await;

    // The seeded key needs a live owner.
    let owner = store
        .find_user_by_username("root")
        .await
        .expect("lookup")
        .expect("root exists");

    let record = ApiKeyRecord {
        id: Uuid::new_v4(),
        user_id: owner.id,
        key: "expiredexpiredexpiredexpired1234".into(),
        name: "stale".into(),
        permission: ApiKeyPermission::FullAccess,
        is_active: true,
        created_at: Utc::now() - Duration::days(30),
        expires_at: Utc::now() - Duration::days(1),
        last_used_at: None,
    };
    store.insert_api_key(&record).await.expect("seed key");

    let (status, _, _) = send(
        &app,
        get_with_key("/auth/api-keys", "expiredexpiredexpiredexpired1234"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn keys_cannot_outrank_their_owner() {
    let state = test_state();
    let app = router(state);
    register(&app, "root").await;
    let bob = register(&app, "bob").await;

    // bob is a USER; FULL_ACCESS implies ManageKeys which bob lacks.
    let (status, body) = create_key(&app, &bob, "too-big", "FULL_ACCESS").await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

    let (status, body) = create_key(&app, &bob, "just-right", "READ_WRITE").await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn revocation_is_scoped_to_the_owner() {
    let state = test_state();
    let app = router(state);
    let root = register(&app, "root").await;
    let bob = register(&app, "bob").await;

    let (_, created) = create_key(&app, &root, "roots-key", "READ_ONLY").await;
    let id = created["id"].as_str().expect("key id");

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/auth/api-keys/{id}"))
        .header(header::AUTHORIZATION, format!("Bearer {bob}"))
        .body(Body::empty())
        .expect("request");
    let (status, body, _) = send(&app, req).await;

    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

#[tokio::test]
async fn expiry_days_are_validated() {
    let state = test_state();
    let app = router(state);
    let bearer = register(&app, "root").await;

    for bad_days in [0, 366, -5] {
        let req = Request::builder()
            .method("POST")
            .uri("/auth/api-keys")
            .header(header::AUTHORIZATION, format!("Bearer {bearer}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "name": "k", "permission": "READ_ONLY", "expiresInDays": bad_days })
                    .to_string(),
            ))
            .expect("request");
        let (status, _, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "days = {bad_days}");
    }

    // Default lands 90 days out.
    let (status, created) = create_key(&app, &bearer, "default-expiry", "READ_ONLY").await;
    assert_eq!(status, StatusCode::OK);
    let expires_at = chrono::DateTime::parse_from_rfc3339(
        created["expiresAt"].as_str().expect("expiresAt"),
    )
    .expect("rfc3339");
    let days_out = (expires_at.with_timezone(&Utc) - Utc::now()).num_days();
    assert!((89..=90).contains(&days_out), "default expiry {days_out} days out");
}
