//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the chat-session REST endpoints and the
//! master definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use mindhaven_core::domain::ChatMessage;
use mindhaven_core::ports::PortError;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        list_sessions_handler,
        crate::web::insights::insight_progress_handler,
    ),
    components(
        schemas(
            crate::web::auth::SignupRequest,
            crate::web::auth::LoginRequest,
            crate::web::auth::AuthResponse,
            SessionSummary,
            crate::web::insights::InsightProgress,
        )
    ),
    tags(
        (name = "MindHaven API", description = "API endpoints for the mood-journaling companion.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One entry in the chat history panel.
#[derive(Serialize, ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the user's chat sessions, newest first.
#[utoipa::path(
    get,
    path = "/sessions",
    responses(
        (status = 200, description = "The user's sessions", body = [SessionSummary]),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_sessions_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sessions = app_state.db.list_chat_sessions(user_id).await.map_err(|e| {
        error!("Failed to list sessions: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong. Please try again.".to_string(),
        )
    })?;

    let summaries: Vec<SessionSummary> = sessions
        .into_iter()
        .map(|s| SessionSummary {
            id: s.id,
            title: s.title,
            created_at: s.created_at,
        })
        .collect();

    Ok(Json(summaries))
}

/// Fetch the full transcript of one session.
pub async fn session_messages_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, (StatusCode, String)> {
    let session = app_state
        .db
        .get_chat_session(session_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => (StatusCode::NOT_FOUND, "Session not found".to_string()),
            _ => {
                error!("Failed to load session {}: {:?}", session_id, e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.".to_string(),
                )
            }
        })?;
    if session.user_id != user_id {
        return Err((StatusCode::NOT_FOUND, "Session not found".to_string()));
    }

    let messages = app_state
        .db
        .messages_for_session(user_id, session_id)
        .await
        .map_err(|e| {
            error!("Failed to load messages for session {}: {:?}", session_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.".to_string(),
            )
        })?;

    Ok(Json(messages))
}

/// Delete a session; the store cascades to its messages.
pub async fn delete_session_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .db
        .delete_chat_session(user_id, session_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => (StatusCode::NOT_FOUND, "Session not found".to_string()),
            _ => {
                error!("Failed to delete session {}: {:?}", session_id, e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.".to_string(),
                )
            }
        })?;

    Ok(StatusCode::NO_CONTENT)
}
