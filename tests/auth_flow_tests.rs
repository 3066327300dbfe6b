//! End-to-end account flows through the public API.
//!
//! Tests cover:
//! - Signup and duplicate signup
//! - Login with right/wrong credentials and token issuance
//! - Access token use, refresh, and logout-everywhere via secret rotation

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;

use tokengate::db::Database;
use tokengate::{ServerConfig, create_app};

async fn create_test_app() -> (axum::Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        jwt_secret: b"test-jwt-secret".to_vec(),
    };
    (create_app(&config), db)
}

async fn post_json(
    app: &axum::Router,
    path: &str,
    body: serde_json::Value,
    auth_header: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(value) = auth_header {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

async fn get_with_auth(
    app: &axum::Router,
    path: &str,
    auth_header: &str,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(path)
                .header(header::AUTHORIZATION, auth_header)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

fn alice_credentials() -> serde_json::Value {
    serde_json::json!({
        "email": "alice@example.com",
        "password": "correct horse battery",
        "username": "alice",
    })
}

/// Sign up and log in, returning (access_token, refresh_token).
async fn signup_and_login(app: &axum::Router) -> (String, String) {
    let (status, _body) = post_json(app, "/signup", alice_credentials(), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(app, "/login", alice_credentials(), None).await;
    assert_eq!(status, StatusCode::OK);

    let access = body["data"]["access_token"].as_str().unwrap().to_string();
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();
    (access, refresh)
}

#[tokio::test]
async fn test_signup_creates_user() {
    let (app, db) = create_test_app().await;

    let (status, body) = post_json(&app, "/signup", alice_credentials(), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["message"], "User created successfully");

    let user = db
        .users()
        .get_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.username, "alice");
    assert!(!user.token_secret.is_empty());
    // Password is stored hashed, never verbatim
    assert_ne!(user.password_hash, "correct horse battery");
}

#[tokio::test]
async fn test_duplicate_signup_rejected() {
    let (app, _db) = create_test_app().await;

    let (status, _body) = post_json(&app, "/signup", alice_credentials(), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&app, "/signup", alice_credentials(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists with the given email");
}

#[tokio::test]
async fn test_signup_without_username() {
    let (app, db) = create_test_app().await;

    let (status, _body) = post_json(
        &app,
        "/signup",
        serde_json::json!({"email": "bob@example.com", "password": "long enough password"}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let user = db
        .users()
        .get_by_email("bob@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.username, "");
}

#[tokio::test]
async fn test_login_issues_both_tokens() {
    let (app, _db) = create_test_app().await;

    let (status, _body) = post_json(&app, "/signup", alice_credentials(), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&app, "/login", alice_credentials(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert!(body["data"]["access_token"].is_string());
    assert!(body["data"]["refresh_token"].is_string());
    assert_eq!(body["data"]["username"], "alice");
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (app, _db) = create_test_app().await;

    let (status, _body) = post_json(&app, "/signup", alice_credentials(), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(
        &app,
        "/login",
        serde_json::json!({"email": "alice@example.com", "password": "wrong password here"}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Incorrect credentials");
}

#[tokio::test]
async fn test_login_unknown_email_same_message() {
    let (app, _db) = create_test_app().await;

    let (status, body) = post_json(
        &app,
        "/login",
        serde_json::json!({"email": "nobody@example.com", "password": "whatever whatever"}),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    // Same wording as wrong password: no account-existence oracle
    assert_eq!(body["message"], "Incorrect credentials");
}

#[tokio::test]
async fn test_access_token_from_login_works() {
    let (app, _db) = create_test_app().await;

    let (access, _refresh) = signup_and_login(&app).await;

    let (status, body) = get_with_auth(&app, "/greet", &format!("Bearer {}", access)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().starts_with("Hello, "));
}

#[tokio::test]
async fn test_refresh_token_round_trip() {
    let (app, _db) = create_test_app().await;

    let (_access, refresh) = signup_and_login(&app).await;

    let (status, body) = get_with_auth(&app, "/refresh-token", &format!("Bearer {}", refresh)).await;
    assert_eq!(status, StatusCode::OK);

    let new_access = body["data"]["access_token"].as_str().unwrap();
    let (status, _body) = get_with_auth(&app, "/greet", &format!("Bearer {}", new_access)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_invalidates_refresh_tokens() {
    let (app, _db) = create_test_app().await;

    let (access, refresh) = signup_and_login(&app).await;

    let (status, body) = post_json(
        &app,
        "/logout",
        serde_json::json!({}),
        Some(&format!("Bearer {}", refresh)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out from all devices");

    // The refresh token no longer validates against the rotated secret
    let (status, body) = get_with_auth(&app, "/refresh-token", &format!("Bearer {}", refresh)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Authentication failed. Invalid token");

    // Access tokens are stateless: still valid until they expire
    let (status, _body) = get_with_auth(&app, "/greet", &format!("Bearer {}", access)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_after_logout_issues_fresh_tokens() {
    let (app, _db) = create_test_app().await;

    let (_access, refresh) = signup_and_login(&app).await;

    let (status, _body) = post_json(
        &app,
        "/logout",
        serde_json::json!({}),
        Some(&format!("Bearer {}", refresh)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&app, "/login", alice_credentials(), None).await;
    assert_eq!(status, StatusCode::OK);

    let new_refresh = body["data"]["refresh_token"].as_str().unwrap();
    let (status, _body) =
        get_with_auth(&app, "/refresh-token", &format!("Bearer {}", new_refresh)).await;
    assert_eq!(status, StatusCode::OK);
}
