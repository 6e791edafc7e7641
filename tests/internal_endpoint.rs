//! Integration tests for the session service's internal endpoint.
//!
//! These tests verify:
//! 1. The PATCH endpoint is idempotent and stages no outbox row
//! 2. An empty configured key rejects every caller
//! 3. The reward worker's HTTP client and the endpoint agree on the contract

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use std::sync::Arc;
use tower::ServiceExt;

use focus_track::adapters::http::internal::INTERNAL_API_KEY_HEADER;
use focus_track::adapters::http::{internal_routes, HttpSessionApiClient, InternalSessionHandlers};
use focus_track::adapters::memory::InMemorySessionStore;
use focus_track::application::handlers::session::{
    CreateSessionCommand, CreateSessionHandler, SetDailyGoalAchievedHandler,
};
use focus_track::config::SessionApiConfig;
use focus_track::domain::foundation::{SessionId, UserId};
use focus_track::ports::{SessionApiError, SessionOfRecord};

// =============================================================================
// Test Infrastructure
// =============================================================================

fn app(store: &InMemorySessionStore, key: &str) -> Router {
    let handler =
        SetDailyGoalAchievedHandler::new(Arc::new(store.clone()), SecretString::new(key.to_string()));
    internal_routes(InternalSessionHandlers::new(Arc::new(handler)))
}

async fn seed_session(store: &InMemorySessionStore) -> SessionId {
    let result = CreateSessionHandler::new(Arc::new(store.clone()))
        .handle(CreateSessionCommand {
            user_id: UserId::new("user-42").unwrap(),
            topic: "Flashcards".to_string(),
            start_time: None,
        })
        .await
        .unwrap();
    *result.session.id()
}

fn flag_request(id: &SessionId, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("PATCH")
        .uri(format!("/api/sessions/{}/daily-goal-achieved", id));
    if let Some(key) = key {
        builder = builder.header(INTERNAL_API_KEY_HEADER, key);
    }
    builder.body(Body::empty()).unwrap()
}

// =============================================================================
// Endpoint Tests
// =============================================================================

#[tokio::test]
async fn repeated_flag_calls_succeed_without_staging_events() {
    let store = InMemorySessionStore::new();
    let id = seed_session(&store).await;
    let outbox_before = store.outbox_rows().await.len();
    let app = app(&store, "secret");

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(flag_request(&id, Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    assert!(store.session(&id).await.unwrap().is_daily_goal_achieved());
    assert_eq!(store.outbox_rows().await.len(), outbox_before);
}

#[tokio::test]
async fn missing_header_is_unauthorized() {
    let store = InMemorySessionStore::new();
    let id = seed_session(&store).await;

    let response = app(&store, "secret")
        .oneshot(flag_request(&id, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn empty_configured_key_rejects_every_caller() {
    let store = InMemorySessionStore::new();
    let id = seed_session(&store).await;
    let app = app(&store, "");

    for key in [None, Some(""), Some("anything")] {
        let response = app.clone().oneshot(flag_request(&id, key)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "key {:?}", key);
    }
    assert!(!store.session(&id).await.unwrap().is_daily_goal_achieved());
}

// =============================================================================
// Client Contract Tests
// =============================================================================

#[tokio::test]
async fn client_and_endpoint_agree_over_tcp() {
    let store = InMemorySessionStore::new();
    let id = seed_session(&store).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = app(&store, "shared");
    tokio::spawn(async move {
        axum::serve(listener, server).await.unwrap();
    });

    let client = HttpSessionApiClient::new(&SessionApiConfig {
        base_url: format!("http://{}/", addr),
        api_key: SecretString::new("shared".to_string()),
        timeout_secs: 5,
    })
    .unwrap();

    client.mark_daily_goal_achieved(&id).await.unwrap();
    client.mark_daily_goal_achieved(&id).await.unwrap();
    assert!(store.session(&id).await.unwrap().is_daily_goal_achieved());

    let missing = SessionId::new();
    assert_eq!(
        client.mark_daily_goal_achieved(&missing).await,
        Err(SessionApiError::NotFound(missing))
    );
}
