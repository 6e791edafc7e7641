//! Routes for the internal endpoint.

use axum::{
    routing::{get, patch},
    Router,
};
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{health, set_daily_goal_achieved, InternalSessionHandlers};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates the internal router, including `/health`.
pub fn internal_routes(handlers: InternalSessionHandlers) -> Router {
    Router::new()
        .route(
            "/api/sessions/:id/daily-goal-achieved",
            patch(set_daily_goal_achieved),
        )
        .route("/health", get(health))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use crate::adapters::http::internal::INTERNAL_API_KEY_HEADER;
    use crate::adapters::memory::InMemorySessionStore;
    use crate::application::handlers::session::{
        CreateSessionCommand, CreateSessionHandler, SetDailyGoalAchievedHandler,
    };
    use crate::domain::foundation::{SessionId, UserId};

    const KEY: &str = "internal-key";

    async fn router_with_session() -> (Router, InMemorySessionStore, SessionId) {
        let store = InMemorySessionStore::new();
        let created = CreateSessionHandler::new(Arc::new(store.clone()))
            .handle(CreateSessionCommand {
                user_id: UserId::new("user-1").unwrap(),
                topic: "Reading".to_string(),
                start_time: None,
            })
            .await
            .unwrap();

        let handler =
            SetDailyGoalAchievedHandler::new(Arc::new(store.clone()), SecretString::new(KEY.into()));
        let router = internal_routes(InternalSessionHandlers::new(Arc::new(handler)));
        (router, store, *created.session.id())
    }

    fn patch_request(path: String, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("PATCH").uri(path);
        if let Some(key) = key {
            builder = builder.header(INTERNAL_API_KEY_HEADER, key);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn flags_session_and_returns_no_content() {
        let (router, store, id) = router_with_session().await;

        let response = router
            .oneshot(patch_request(
                format!("/api/sessions/{}/daily-goal-achieved", id),
                Some(KEY),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(store.session(&id).await.unwrap().is_daily_goal_achieved());
    }

    #[tokio::test]
    async fn wrong_key_is_unauthorized() {
        let (router, store, id) = router_with_session().await;

        let response = router
            .oneshot(patch_request(
                format!("/api/sessions/{}/daily-goal-achieved", id),
                Some("nope"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!store.session(&id).await.unwrap().is_daily_goal_achieved());
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (router, _, _) = router_with_session().await;

        let response = router
            .oneshot(patch_request(
                format!("/api/sessions/{}/daily-goal-achieved", SessionId::new()),
                Some(KEY),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let (router, _, _) = router_with_session().await;

        let response = router
            .oneshot(patch_request(
                "/api/sessions/not-a-uuid/daily-goal-achieved".to_string(),
                Some(KEY),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (router, _, _) = router_with_session().await;

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
