//! services/api/src/web/moods.rs
//!
//! Mood journal endpoints: listing history and direct logging. Logging
//! replies with a short generated reflection; the reflection comes back as
//! a canned fallback when the completion service fails, never as an error.

use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use mindhaven_core::domain::{Mood, MoodEntry, MoodReflection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct LogMoodRequest {
    pub mood: Mood,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct LogMoodResponse {
    pub entry: MoodEntry,
    pub reflection: MoodReflection,
}

/// GET /moods - the user's mood history, newest first.
pub async fn list_moods_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<MoodEntry>>, (StatusCode, String)> {
    let moods = app_state.db.list_moods(user_id).await.map_err(|e| {
        error!("Failed to list moods: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong. Please try again.".to_string(),
        )
    })?;
    Ok(Json(moods))
}

/// POST /moods - log a mood directly (no session link).
pub async fn log_mood_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<LogMoodRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // Empty notes are stored as NULL, not as an empty string.
    let notes = req
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|notes| !notes.is_empty());

    let entry = app_state
        .db
        .insert_mood(user_id, req.mood, notes, None)
        .await
        .map_err(|e| {
            error!("Error logging mood: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.".to_string(),
            )
        })?
        .ok_or_else(|| {
            // Unreachable for direct logs (no session uniqueness applies),
            // but the port contract allows it.
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.".to_string(),
            )
        })?;

    // The reflection adapter falls back internally; this await cannot fail
    // the logging that already happened.
    let reflection = app_state
        .guidance_adapter
        .mood_reflection(req.mood, notes.unwrap_or(""))
        .await
        .unwrap_or(MoodReflection {
            reflection: "Thank you for sharing how you feel.".to_string(),
            suggestion: None,
        });

    Ok((StatusCode::CREATED, Json(LogMoodResponse { entry, reflection })))
}
