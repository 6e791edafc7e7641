//! HTTP handlers for the internal endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::application::handlers::session::{
    SetDailyGoalAchievedCommand, SetDailyGoalAchievedHandler,
};
use crate::domain::foundation::SessionId;
use crate::domain::session::SessionError;

use super::dto::{ErrorResponse, HealthResponse};

/// Header carrying the shared key between the two services.
pub const INTERNAL_API_KEY_HEADER: &str = "x-internal-api-key";

#[derive(Clone)]
pub struct InternalSessionHandlers {
    set_daily_goal_achieved: Arc<SetDailyGoalAchievedHandler>,
}

impl InternalSessionHandlers {
    pub fn new(set_daily_goal_achieved: Arc<SetDailyGoalAchievedHandler>) -> Self {
        Self {
            set_daily_goal_achieved,
        }
    }
}

/// PATCH /api/sessions/:id/daily-goal-achieved
///
/// 204 when the flag is set (including when it already was).
pub async fn set_daily_goal_achieved(
    State(handlers): State<InternalSessionHandlers>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let session_id = match session_id.parse::<SessionId>() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("Invalid session ID")),
            )
                .into_response()
        }
    };

    let api_key = headers
        .get(INTERNAL_API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let cmd = SetDailyGoalAchievedCommand {
        session_id,
        api_key,
    };

    match handlers.set_daily_goal_achieved.handle(cmd).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => handle_session_error(e),
    }
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

fn handle_session_error(error: SessionError) -> Response {
    match error {
        SessionError::Unauthorized => {
            warn!("Rejected internal call with missing or invalid API key");
            (StatusCode::UNAUTHORIZED, Json(ErrorResponse::unauthorized())).into_response()
        }
        SessionError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Session", &id.to_string())),
        )
            .into_response(),
        SessionError::ValidationFailed { field, message } => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(format!(
                "Validation failed for {}: {}",
                field, message
            ))),
        )
            .into_response(),
        other @ (SessionError::Forbidden | SessionError::Infrastructure(_)) => {
            error!(error = %other.message(), "Internal endpoint failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("Failed to update session")),
            )
                .into_response()
        }
    }
}
