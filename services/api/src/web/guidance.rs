//! services/api/src/web/guidance.rs
//!
//! Daily guidance endpoints: the home-screen document, the personalized
//! tip, the two self-help tools and report artwork. Home and tip go through
//! the injected daily caches so the completion service is asked at most
//! once per user per day (the tip additionally refreshes when the mood
//! count changes).

use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use mindhaven_core::domain::HomeContent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

#[derive(Serialize)]
pub struct TipResponse {
    pub tip: String,
}

#[derive(Deserialize)]
pub struct BreakdownRequest {
    pub task: String,
}

#[derive(Serialize)]
pub struct BreakdownResponse {
    pub steps: Vec<String>,
}

#[derive(Deserialize)]
pub struct ReframeRequest {
    pub thought: String,
}

#[derive(Serialize)]
pub struct ReframeResponse {
    pub perspectives: Vec<String>,
}

#[derive(Deserialize)]
pub struct ArtworkRequest {
    pub prompt: String,
}

#[derive(Serialize)]
pub struct ArtworkResponse {
    pub image_url: String,
}

fn generic_failure() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong. Please try again.".to_string(),
    )
}

/// GET /home - the daily home-screen document, cached once per day.
pub async fn home_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<HomeContent>, (StatusCode, String)> {
    let today = Utc::now().date_naive();
    if let Some(cached) = app_state.home_cache.get_fresh(user_id, today, None) {
        return Ok(Json(cached));
    }

    let user = app_state.db.get_user(user_id).await.map_err(|e| {
        error!("Failed to load user for home content: {:?}", e);
        generic_failure()
    })?;
    let moods = app_state.db.list_moods(user_id).await.map_err(|e| {
        error!("Failed to load moods for home content: {:?}", e);
        generic_failure()
    })?;

    // The adapter falls back internally on completion failures.
    let content = app_state
        .guidance_adapter
        .home_content(&user.display_name, &moods)
        .await
        .map_err(|e| {
            error!("Home content generation failed: {:?}", e);
            generic_failure()
        })?;

    app_state
        .home_cache
        .store(user_id, today, None, content.clone());
    Ok(Json(content))
}

/// GET /tip - the personalized tip, cached per day and per mood count.
pub async fn tip_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<TipResponse>, (StatusCode, String)> {
    let today = Utc::now().date_naive();
    let mood_count = app_state.db.count_moods(user_id).await.map_err(|e| {
        error!("Failed to count moods for tip: {:?}", e);
        generic_failure()
    })?;

    if let Some(tip) = app_state
        .tip_cache
        .get_fresh(user_id, today, Some(mood_count))
    {
        return Ok(Json(TipResponse { tip }));
    }

    let moods = app_state.db.list_moods(user_id).await.map_err(|e| {
        error!("Failed to load moods for tip: {:?}", e);
        generic_failure()
    })?;

    let tip = app_state
        .guidance_adapter
        .personalized_tip(&moods)
        .await
        .map_err(|e| {
            error!("Tip generation failed: {:?}", e);
            generic_failure()
        })?;

    app_state
        .tip_cache
        .store(user_id, today, Some(mood_count), tip.clone());
    Ok(Json(TipResponse { tip }))
}

/// POST /tools/breakdown - split an overwhelming task into small steps.
pub async fn breakdown_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(_user_id): Extension<Uuid>,
    Json(req): Json<BreakdownRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let task = req.task.trim();
    if task.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "A task is required".to_string()));
    }

    let steps = app_state
        .guidance_adapter
        .break_down_task(task)
        .await
        .map_err(|e| {
            error!("Task breakdown failed: {:?}", e);
            generic_failure()
        })?;

    Ok(Json(BreakdownResponse { steps }))
}

/// POST /tools/reframe - offer balanced perspectives on a negative thought.
pub async fn reframe_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(_user_id): Extension<Uuid>,
    Json(req): Json<ReframeRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let thought = req.thought.trim();
    if thought.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "A thought is required".to_string()));
    }

    let perspectives = app_state
        .guidance_adapter
        .reframe_thought(thought)
        .await
        .map_err(|e| {
            error!("Thought reframing failed: {:?}", e);
            generic_failure()
        })?;

    Ok(Json(ReframeResponse { perspectives }))
}

/// POST /artwork - render one of a report's image prompts.
pub async fn artwork_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(_user_id): Extension<Uuid>,
    Json(req): Json<ArtworkRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "A prompt is required".to_string()));
    }

    let image_url = app_state
        .image_adapter
        .generate_artwork(prompt)
        .await
        .map_err(|e| {
            error!("Image generation failed: {:?}", e);
            generic_failure()
        })?;

    Ok(Json(ArtworkResponse { image_url }))
}
