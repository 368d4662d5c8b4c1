//! services/api/src/web/insights.rs
//!
//! Weekly insight endpoints: report listing and the progress meter that
//! shows how close the user is to unlocking the next report.

use crate::web::state::AppState;
use crate::web::wrapup::{INSIGHT_TRIGGER_DAYS, INSIGHT_WINDOW_DAYS};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{Duration, Utc};
use mindhaven_core::domain::WeeklyInsight;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, ToSchema)]
pub struct InsightProgress {
    pub distinct_days: i64,
    pub required_days: i64,
    pub is_ready: bool,
}

/// GET /insights - all generated reports, newest first.
pub async fn list_insights_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<Json<Vec<WeeklyInsight>>, (StatusCode, String)> {
    let insights = app_state
        .db
        .list_weekly_insights(user_id)
        .await
        .map_err(|e| {
            error!("Failed to list weekly insights: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong. Please try again.".to_string(),
            )
        })?;
    Ok(Json(insights))
}

/// GET /insights/progress - distinct chat days in the current window vs
/// the required threshold.
#[utoipa::path(
    get,
    path = "/insights/progress",
    responses(
        (status = 200, description = "Progress towards the next weekly insight", body = InsightProgress),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn insight_progress_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Json<InsightProgress> {
    let is_ready = match app_state.db.latest_weekly_insight(user_id).await {
        Ok(latest) => latest.is_some(),
        Err(e) => {
            error!("Failed to fetch latest insight: {:?}", e);
            false
        }
    };

    let since = Utc::now() - Duration::days(INSIGHT_WINDOW_DAYS);
    let distinct_days = match app_state.db.distinct_chat_days_since(user_id, since).await {
        Ok(days) => days,
        Err(e) => {
            error!("Error fetching distinct chat days: {:?}", e);
            0
        }
    };

    Json(InsightProgress {
        distinct_days,
        required_days: INSIGHT_TRIGGER_DAYS,
        is_ready,
    })
}
