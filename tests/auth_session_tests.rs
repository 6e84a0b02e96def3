// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Tests for login, restore and logout through `AppContext`.

use serde_json::json;
use spark_client::models::{LoginRequest, RegisterRequest};
use spark_client::services::{DiscoveryError, LogoutReason, SessionEvent};
use spark_client::storage::{keys, CredentialStore, MemoryStore};
use spark_client::AppContext;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{seeded_store, test_config, user_json};

fn context(server: &MockServer, store: Arc<MemoryStore>) -> AppContext {
    AppContext::with_store(test_config(&server.uri()), store).expect("Failed to build context")
}

/// Poll `check` until it holds; background listeners run on their own schedule.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..50 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

#[tokio::test]
async fn test_login_persists_tokens_and_authenticates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({ "email": "a@b.com", "password": "x" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "acc-1",
            "refreshToken": "ref-1",
            "user": user_json("u1", false)
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("Authorization", "Bearer acc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1", false)))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let ctx = context(&server, store.clone());

    let user = ctx
        .session
        .login(LoginRequest::new("a@b.com", "x"))
        .await
        .unwrap();

    assert_eq!(user.id, "u1");
    let state = ctx.session.state();
    assert!(state.is_authenticated);
    assert!(!state.is_loading);
    assert!(state.error.is_none());
    assert_eq!(
        store.get(keys::ACCESS_TOKEN).await.unwrap().as_deref(),
        Some("acc-1")
    );
    assert_eq!(
        store.get(keys::REFRESH_TOKEN).await.unwrap().as_deref(),
        Some("ref-1")
    );

    // Next authenticated request carries the new token
    ctx.session.fetch_me().await.unwrap();
}

#[tokio::test]
async fn test_invalid_login_input_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = context(&server, Arc::new(MemoryStore::new()));

    let err = ctx
        .session
        .login(LoginRequest::new("not-an-email", "x"))
        .await
        .unwrap_err();

    assert!(matches!(err, spark_client::error::ApiError::Validation(_)));
    let state = ctx.session.state();
    assert!(!state.is_authenticated);
    assert!(!state.is_loading);
    assert_eq!(
        state.error.as_deref(),
        Some("Please enter a valid email address")
    );
}

#[tokio::test]
async fn test_short_register_password_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = context(&server, Arc::new(MemoryStore::new()));
    let request = RegisterRequest {
        name: "Alex".to_string(),
        email: "a@b.com".to_string(),
        password: "short".to_string(),
    };

    let err = ctx.session.register(request).await.unwrap_err();
    assert_eq!(err.user_message(), "Password must be at least 8 characters");
}

#[tokio::test]
async fn test_invalid_credentials_message_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid credentials" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = context(&server, Arc::new(MemoryStore::new()));

    let err = ctx
        .session
        .login(LoginRequest::new("a@b.com", "wrong"))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    let state = ctx.session.state();
    assert!(!state.is_authenticated);
    assert_eq!(state.error.as_deref(), Some("Invalid credentials"));
}

#[tokio::test]
async fn test_restore_uses_stored_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("Authorization", "Bearer acc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1", true)))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = context(&server, seeded_store("acc-1", "ref-1").await);

    let user = ctx.session.restore().await.unwrap();
    assert_eq!(user.map(|u| u.id), Some("u1".to_string()));
    assert!(ctx.session.is_authenticated());
    assert!(ctx.session.is_premium());
}

#[tokio::test]
async fn test_restore_without_credentials_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1", false)))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = context(&server, Arc::new(MemoryStore::new()));

    assert!(ctx.session.restore().await.unwrap().is_none());
    assert!(!ctx.session.is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_tokens_and_broadcasts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1", false)))
        .mount(&server)
        .await;

    let store = seeded_store("acc-1", "ref-1").await;
    let ctx = context(&server, store.clone());
    let mut events = ctx.api.coordinator().subscribe();

    ctx.session.restore().await.unwrap();
    ctx.session.logout().await.unwrap();

    assert!(!ctx.session.is_authenticated());
    assert!(ctx.session.user().is_none());
    assert!(store.is_empty());
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut {
            reason: LogoutReason::UserRequested
        }
    );
}

#[tokio::test]
async fn test_refresh_failure_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("u1", false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discovery/boost/status"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let store = seeded_store("acc-1", "ref-1").await;
    let ctx = context(&server, store.clone());
    ctx.session.restore().await.unwrap();
    assert!(ctx.session.is_authenticated());

    let err = ctx.discovery.boost_status().await.unwrap_err();
    assert!(matches!(err, DiscoveryError::Api(ref e) if e.is_session_expired()));
    assert!(store.is_empty());

    let session = ctx.session.clone();
    assert!(eventually(|| !session.is_authenticated()).await);
    assert_eq!(
        ctx.session.state().error.as_deref(),
        Some("Your session has expired. Please log in again.")
    );
}
